//! Environment-sourced configuration, validated once at startup.
//!
//! Required credentials fail startup with a [`ConfigError`]; soft values
//! (environment name, execution mode) fall back to a documented default
//! with a warning.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Deployment environment. Invalid values fall back to `Development`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    fn from_env() -> Self {
        Self::parse(std::env::var("THREADWISE_ENV").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("development") | None => Self::Development,
            Some("staging") => Self::Staging,
            Some("production") => Self::Production,
            Some(other) => {
                tracing::warn!("Invalid environment: {other}. Defaulting to development.");
                Self::Development
            }
        }
    }
}

/// Slack auth, shaped by the deployment mode.
#[derive(Debug, Clone)]
pub enum SlackAuth {
    /// Single-workspace deployment: one bot token.
    SingleWorkspace {
        bot_token: SecretString,
        channel_id: Option<String>,
    },
    /// Multi-workspace deployment (OAuth app credentials).
    MultiWorkspace {
        client_id: String,
        client_secret: SecretString,
        redirect_uri: String,
    },
}

/// How workspace analyses are executed each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Loopback HTTP call to our own analyze endpoint.
    Direct,
    /// One isolated Kubernetes Job per workspace.
    Kubernetes,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Kubernetes => "kubernetes",
        }
    }

    fn from_env() -> Self {
        Self::parse(std::env::var("EXECUTION_MODE").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("direct") | None => Self::Direct,
            Some("kubernetes") => Self::Kubernetes,
            Some(other) => {
                tracing::warn!("Unknown execution mode: {other}. Defaulting to direct.");
                Self::Direct
            }
        }
    }
}

/// Model provider settings.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Jira credential set for one workspace (or the global fallback).
#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub base_url: String,
    pub email: String,
    pub api_token: SecretString,
    pub project_key: String,
}

/// Kubernetes job-backend settings.
#[derive(Debug, Clone)]
pub struct KubernetesConfig {
    pub api_url: String,
    pub token: Option<SecretString>,
    pub namespace: String,
    pub image_name: String,
    pub image_tag: String,
    pub ttl_seconds_after_finished: u64,
    pub backoff_limit: u32,
    pub memory_request: String,
    pub memory_limit: String,
    pub cpu_request: String,
    pub cpu_limit: String,
}

/// Server bind settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Cron orchestrator settings.
#[derive(Debug, Clone)]
pub struct CronConfig {
    pub enabled: bool,
    pub schedule: String,
    pub run_on_start: bool,
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub auth: SlackAuth,
    pub server: ServerConfig,
    pub api_url: String,
    pub model: ModelConfig,
    pub jira: Option<JiraConfig>,
    pub execution_mode: ExecutionMode,
    pub kubernetes: KubernetesConfig,
    pub cron: CronConfig,
    /// Per-call timeout for a direct loopback dispatch.
    pub dispatch_timeout: Duration,
}

impl AppConfig {
    /// Load and validate configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_env();

        let auth = match std::env::var("DEPLOYMENT_MODE").ok().as_deref() {
            Some("multi") => SlackAuth::MultiWorkspace {
                client_id: require_env("SLACK_CLIENT_ID")?,
                client_secret: SecretString::from(require_env("SLACK_CLIENT_SECRET")?),
                redirect_uri: env_or("SLACK_REDIRECT_URI", "http://localhost:3000/oauth/callback"),
            },
            // "single" is the default deployment mode.
            _ => SlackAuth::SingleWorkspace {
                bot_token: SecretString::from(require_env("SLACK_BOT_TOKEN")?),
                channel_id: std::env::var("SLACK_CHANNEL_ID").ok(),
            },
        };

        let server = ServerConfig {
            host: env_or("HOST", "127.0.0.1"),
            port: parse_env("PORT", 3000)?,
        };

        let api_url = std::env::var("API_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", server.host, server.port));

        let model = ModelConfig {
            api_key: SecretString::from(require_env("LLM_API_KEY")?),
            model: env_or("LLM_MODEL", "openai/gpt-4o-mini"),
            base_url: env_or("LLM_BASE_URL", "https://openrouter.ai/api/v1"),
            temperature: parse_env_opt("LLM_TEMPERATURE")?,
            max_tokens: parse_env_opt("LLM_MAX_TOKENS")?,
        };

        // The Jira fallback credential set is only built when fully specified.
        let jira = match (
            std::env::var("JIRA_BASE_URL").ok(),
            std::env::var("JIRA_EMAIL").ok(),
            std::env::var("JIRA_API_TOKEN").ok(),
            std::env::var("JIRA_PROJECT_KEY").ok(),
        ) {
            (Some(base_url), Some(email), Some(api_token), Some(project_key)) => {
                Some(JiraConfig {
                    base_url,
                    email,
                    api_token: SecretString::from(api_token),
                    project_key,
                })
            }
            _ => {
                tracing::warn!("Jira credentials not fully configured; ticket creation disabled");
                None
            }
        };

        let execution_mode = ExecutionMode::from_env();

        let kubernetes = KubernetesConfig {
            api_url: env_or("K8S_API_URL", "https://kubernetes.default.svc"),
            token: std::env::var("K8S_TOKEN").ok().map(SecretString::from),
            namespace: env_or("K8S_NAMESPACE", "default"),
            image_name: env_or("K8S_IMAGE_NAME", "threadwise"),
            image_tag: env_or("K8S_IMAGE_TAG", "latest"),
            ttl_seconds_after_finished: parse_env("K8S_TTL_SECONDS", 3600)?,
            backoff_limit: parse_env("K8S_BACKOFF_LIMIT", 3)?,
            memory_request: env_or("K8S_MEMORY_REQUEST", "64Mi"),
            memory_limit: env_or("K8S_MEMORY_LIMIT", "128Mi"),
            cpu_request: env_or("K8S_CPU_REQUEST", "50m"),
            cpu_limit: env_or("K8S_CPU_LIMIT", "100m"),
        };

        let cron = CronConfig {
            enabled: std::env::var("ENABLE_CRON").as_deref() == Ok("true"),
            schedule: env_or("CRON_SCHEDULE", "*/15 * * * *"),
            run_on_start: std::env::var("RUN_ON_START").as_deref() == Ok("true"),
        };

        Ok(Self {
            environment,
            auth,
            server,
            api_url,
            model,
            jira,
            execution_mode,
            kubernetes,
            cron,
            dispatch_timeout: Duration::from_secs(60),
        })
    }
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{e}"),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_opt<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            }),
        Err(_) => Ok(None),
    }
}
