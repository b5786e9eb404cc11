//! Shared types for thread analysis.
//!
//! Per-thread artifacts ([`ThreadContext`], [`Categorization`],
//! [`ThreadSummary`], [`TaskSet`]) are created fresh for each thread,
//! consumed within that thread's pipeline run, and discarded.

use serde::{Deserialize, Serialize};

use crate::clients::slack::{Reaction, ThreadRoot};

// ── Thread context ──────────────────────────────────────────────────

/// Root-message metadata carried into the model prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub text: String,
    pub user: String,
    pub reply_count: u32,
    pub reply_users_count: u32,
    pub reply_users: Vec<String>,
    pub reactions: Vec<Reaction>,
    pub is_locked: bool,
}

/// One resolved message: author id, display name, text, timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageInfo {
    pub user: String,
    pub user_name: String,
    pub text: String,
    pub timestamp: String,
}

/// Read-only snapshot of a thread, built once per thread.
///
/// Message ordering is chronological and stable (source-list order from the
/// chat client).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadContext {
    pub thread: ThreadInfo,
    pub messages: Vec<MessageInfo>,
}

impl ThreadContext {
    pub fn from_root(root: &ThreadRoot, messages: Vec<MessageInfo>) -> Self {
        Self {
            thread: ThreadInfo {
                text: root.text.clone(),
                user: root.user.clone(),
                reply_count: root.reply_count,
                reply_users_count: root.reply_users_count,
                reply_users: root.reply_users.clone(),
                reactions: root.reactions.clone(),
                is_locked: root.is_locked,
            },
            messages,
        }
    }
}

// ── Classification ──────────────────────────────────────────────────

/// Thread category. `CasualChat` is terminal for the pipeline: such threads
/// are never summarized or ticketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    TechnicalIssue,
    DecisionDiscussion,
    QuestionAnswer,
    StatusUpdate,
    CasualChat,
}

impl Category {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TechnicalIssue => "technical_issue",
            Self::DecisionDiscussion => "decision_discussion",
            Self::QuestionAnswer => "question_answer",
            Self::StatusUpdate => "status_update",
            Self::CasualChat => "casual_chat",
        }
    }
}

/// Conversational tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Serious,
    Neutral,
    Playful,
    Sarcastic,
}

/// Resolution state at classification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Resolved,
    Unresolved,
    NotApplicable,
}

/// Three-axis classification result. Exactly one value per axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Categorization {
    pub category: Category,
    pub tone: Tone,
    pub resolution: Resolution,
}

// ── Summary ─────────────────────────────────────────────────────────

/// Status reported by the summarization call. A closed enum: unknown
/// status strings fail at parse time as a contract violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    Resolved,
    Unresolved,
    InProgress,
}

/// Summarization result; drives the reply format and the resolution marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub summary: String,
    pub status: SummaryStatus,
    #[serde(default)]
    pub confidence: f32,
}

// ── Task extraction ─────────────────────────────────────────────────

/// One actionable item extracted from a thread. Becomes one ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedTask {
    pub summary: String,
    /// ADF-like rich-text document for the ticket body.
    pub description: serde_json::Value,
}

/// Zero or more extracted tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSet {
    pub tasks: Vec<ExtractedTask>,
}
