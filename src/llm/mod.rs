//! Model client for Threadwise.
//!
//! Prompt-in, text-out against an OpenAI-compatible chat completions API.
//! The content is *expected* (not guaranteed) to be JSON per the calling
//! prompt; contract enforcement lives in the classification engine.

mod openrouter;

pub use openrouter::OpenRouterClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// One chat message in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Model completion: the raw text content of the first choice.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
}

/// Abstract model client consumed by the classification engine.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, ModelError>;
}
