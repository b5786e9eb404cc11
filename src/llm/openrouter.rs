//! OpenAI-compatible chat completions client (HTTP direct, no SDK).
//!
//! Works against OpenRouter or any provider exposing the same
//! `/chat/completions` contract.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::config::ModelConfig;
use crate::error::ModelError;
use crate::llm::{ChatMessage, Completion, ModelClient};

/// Per-request timeout for a single completion call.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenRouterClient {
    client: reqwest::Client,
    config: ModelConfig,
}

#[derive(Debug, Deserialize)]
struct CompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl OpenRouterClient {
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(COMPLETION_TIMEOUT)
            .build()
            .map_err(|e| ModelError::RequestFailed(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl ModelClient for OpenRouterClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, ModelError> {
        let mut body = serde_json::Map::new();
        body.insert("model".to_string(), serde_json::json!(self.config.model));
        body.insert("messages".to_string(), serde_json::json!(messages));
        if let Some(temp) = self.config.temperature {
            body.insert("temperature".to_string(), serde_json::json!(temp));
        }
        if let Some(max_tokens) = self.config.max_tokens {
            body.insert("max_tokens".to_string(), serde_json::json!(max_tokens));
        }

        let url = format!("{}/chat/completions", self.config.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionsResponse = resp
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ModelError::InvalidResponse("empty choices array".to_string()))?;

        Ok(Completion { content })
    }
}
