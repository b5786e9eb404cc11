//! Error types for Threadwise.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Chat client error: {0}")]
    Chat(#[from] ChatError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    #[error("Ticket error: {0}")]
    Ticket(#[from] TicketError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Configuration-related errors. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Invalid cron expression '{expression}': {message}")]
    InvalidCronExpression { expression: String, message: String },
}

/// Chat platform (Slack) client errors.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Slack request to {method} failed: {reason}")]
    RequestFailed { method: String, reason: String },

    #[error("Slack API error on {method}: {code}")]
    Api { method: String, code: String },

    #[error("Invalid response from {method}: {reason}")]
    InvalidResponse { method: String, reason: String },
}

/// Model provider errors.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model request failed: {0}")]
    RequestFailed(String),

    #[error("Model returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),
}

/// Classification engine errors: model-call faults and JSON-contract
/// violations. Always thread-local, never fatal to a workspace run.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("Model call failed during {stage}: {source}")]
    ModelCall {
        stage: &'static str,
        #[source]
        source: ModelError,
    },

    #[error("Model response violated the {stage} contract: {reason}")]
    Contract { stage: &'static str, reason: String },

    #[error("Category {0} has no summary template")]
    NotSummarizable(String),
}

/// Ticketing (Jira) client errors.
#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("No ticket configuration for workspace {workspace_id} and no fallback registered")]
    NoConfig { workspace_id: String },

    #[error("Failed to create issue: {0}")]
    CreateFailed(String),

    #[error("Jira returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Workspace analysis errors. Raised when a whole workspace run cannot
/// proceed; per-thread faults are absorbed before reaching this level.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    #[error("Failed to list users for workspace {workspace_id}: {source}")]
    UserListing {
        workspace_id: String,
        #[source]
        source: ChatError,
    },

    #[error("Failed to list threads in channel {channel_id}: {source}")]
    ChannelListing {
        channel_id: String,
        #[source]
        source: ChatError,
    },

    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    #[error("Ticket error: {0}")]
    Ticket(#[from] TicketError),
}

/// Execution dispatch errors.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to submit job for workspace {workspace_id}: {reason}")]
    SubmitFailed { workspace_id: String, reason: String },

    #[error("Dispatch request failed: {0}")]
    Http(String),
}

/// Result type alias for Threadwise.
pub type Result<T> = std::result::Result<T, Error>;
