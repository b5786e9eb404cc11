//! Slack Web API client.
//!
//! Thin protocol adapter behind the [`ChatClient`] trait: thread roots come
//! from `conversations.history`, replies from `conversations.replies`,
//! summaries are posted with `chat.postMessage` (blocks + fallback text) and
//! resolution markers with `reactions.add`.

use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Emoji applied to a resolved thread's root message.
pub const RESOLUTION_MARKER: &str = "white_check_mark";

/// A reaction attached to a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub name: String,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub count: u32,
}

/// The root message of a conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadRoot {
    pub ts: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub reply_count: u32,
    #[serde(default)]
    pub reply_users_count: u32,
    #[serde(default)]
    pub reply_users: Vec<String>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub is_locked: bool,
}

/// A single message inside a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    pub ts: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user: String,
}

/// Abstract chat platform contract consumed by the analyzer.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Map of user id to display name for the whole workspace.
    async fn list_users(&self, workspace_id: &str) -> Result<HashMap<String, String>, ChatError>;

    /// Thread roots (messages that accumulated replies) in a channel.
    async fn list_thread_roots(
        &self,
        channel_id: &str,
        workspace_id: &str,
    ) -> Result<Vec<ThreadRoot>, ChatError>;

    /// Full ordered message list for one thread.
    async fn list_messages(
        &self,
        channel_id: &str,
        thread_ts: &str,
        workspace_id: &str,
    ) -> Result<Vec<RawMessage>, ChatError>;

    /// Resolve a single user id to a display name.
    async fn resolve_user_name(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<String, ChatError>;

    /// Post a block-formatted reply under a thread root.
    async fn post_reply(
        &self,
        channel_id: &str,
        thread_ts: &str,
        workspace_id: &str,
        body: &serde_json::Value,
        fallback_text: &str,
    ) -> Result<(), ChatError>;

    /// Attach the resolution marker reaction to a thread root.
    async fn add_resolution_marker(
        &self,
        channel_id: &str,
        thread_ts: &str,
        workspace_id: &str,
    ) -> Result<(), ChatError>;
}

/// Slack Web API implementation of [`ChatClient`].
///
/// Single-workspace deployment: one bot token. The `workspace_id` arguments
/// are part of the contract so a multi-workspace token resolver can slot in
/// behind the same trait.
pub struct SlackClient {
    client: reqwest::Client,
    bot_token: SecretString,
}

#[derive(Debug, Deserialize)]
struct SlackEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    members: Vec<SlackUser>,
    #[serde(default)]
    messages: Vec<serde_json::Value>,
    #[serde(default)]
    user: Option<SlackUser>,
}

#[derive(Debug, Deserialize)]
struct SlackUser {
    id: Option<String>,
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl SlackUser {
    fn display_name(&self) -> String {
        self.real_name
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

impl SlackClient {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token,
        }
    }

    fn api_url(method: &str) -> String {
        format!("{SLACK_API_BASE}/{method}")
    }

    /// GET with query parameters, checking the ok/error envelope.
    async fn get(
        &self,
        method: &str,
        query: &[(&str, &str)],
    ) -> Result<SlackEnvelope, ChatError> {
        let resp = self
            .client
            .get(Self::api_url(method))
            .bearer_auth(self.bot_token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|e| ChatError::RequestFailed {
                method: method.to_string(),
                reason: e.to_string(),
            })?;

        let envelope: SlackEnvelope =
            resp.json().await.map_err(|e| ChatError::InvalidResponse {
                method: method.to_string(),
                reason: e.to_string(),
            })?;

        Self::check_envelope(method, envelope)
    }

    /// POST with a JSON body, checking the ok/error envelope.
    async fn post(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<SlackEnvelope, ChatError> {
        let resp = self
            .client
            .post(Self::api_url(method))
            .bearer_auth(self.bot_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| ChatError::RequestFailed {
                method: method.to_string(),
                reason: e.to_string(),
            })?;

        let envelope: SlackEnvelope =
            resp.json().await.map_err(|e| ChatError::InvalidResponse {
                method: method.to_string(),
                reason: e.to_string(),
            })?;

        Self::check_envelope(method, envelope)
    }

    fn check_envelope(method: &str, envelope: SlackEnvelope) -> Result<SlackEnvelope, ChatError> {
        if !envelope.ok {
            return Err(ChatError::Api {
                method: method.to_string(),
                code: envelope.error.unwrap_or_else(|| "unknown_error".to_string()),
            });
        }
        Ok(envelope)
    }
}

#[async_trait]
impl ChatClient for SlackClient {
    async fn list_users(&self, workspace_id: &str) -> Result<HashMap<String, String>, ChatError> {
        tracing::debug!(workspace_id, "Listing workspace users");
        let envelope = self.get("users.list", &[]).await?;

        let mut names = HashMap::with_capacity(envelope.members.len());
        for member in envelope.members {
            if let Some(id) = member.id.clone() {
                names.insert(id, member.display_name());
            }
        }
        Ok(names)
    }

    async fn list_thread_roots(
        &self,
        channel_id: &str,
        workspace_id: &str,
    ) -> Result<Vec<ThreadRoot>, ChatError> {
        tracing::debug!(channel_id, workspace_id, "Fetching channel history");
        let envelope = self
            .get("conversations.history", &[("channel", channel_id)])
            .await?;

        // Only messages that started a thread are roots.
        let roots = envelope
            .messages
            .into_iter()
            .filter_map(|raw| serde_json::from_value::<ThreadRoot>(raw).ok())
            .filter(|root| root.reply_count > 0)
            .collect();
        Ok(roots)
    }

    async fn list_messages(
        &self,
        channel_id: &str,
        thread_ts: &str,
        workspace_id: &str,
    ) -> Result<Vec<RawMessage>, ChatError> {
        tracing::debug!(channel_id, thread_ts, workspace_id, "Fetching thread replies");
        let envelope = self
            .get(
                "conversations.replies",
                &[("channel", channel_id), ("ts", thread_ts)],
            )
            .await?;

        let messages = envelope
            .messages
            .into_iter()
            .filter_map(|raw| serde_json::from_value::<RawMessage>(raw).ok())
            .collect();
        Ok(messages)
    }

    async fn resolve_user_name(
        &self,
        user_id: &str,
        _workspace_id: &str,
    ) -> Result<String, ChatError> {
        let envelope = self.get("users.info", &[("user", user_id)]).await?;
        Ok(envelope
            .user
            .map(|u| u.display_name())
            .unwrap_or_else(|| "unknown".to_string()))
    }

    async fn post_reply(
        &self,
        channel_id: &str,
        thread_ts: &str,
        workspace_id: &str,
        body: &serde_json::Value,
        fallback_text: &str,
    ) -> Result<(), ChatError> {
        tracing::info!(channel_id, thread_ts, workspace_id, "Posting status update");
        let payload = serde_json::json!({
            "channel": channel_id,
            "thread_ts": thread_ts,
            "blocks": body["blocks"],
            "text": fallback_text,
        });
        self.post("chat.postMessage", &payload).await?;
        Ok(())
    }

    async fn add_resolution_marker(
        &self,
        channel_id: &str,
        thread_ts: &str,
        workspace_id: &str,
    ) -> Result<(), ChatError> {
        tracing::info!(channel_id, thread_ts, workspace_id, "Adding resolution marker");
        let payload = serde_json::json!({
            "channel": channel_id,
            "timestamp": thread_ts,
            "name": RESOLUTION_MARKER,
        });
        self.post("reactions.add", &payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_root_parses_with_defaults() {
        let raw = serde_json::json!({
            "ts": "1234567890.123456",
            "text": "Test thread message",
            "user": "U12345",
            "reply_count": 5,
            "reply_users_count": 2,
            "reply_users": ["U12345", "U67890"],
        });
        let root: ThreadRoot = serde_json::from_value(raw).unwrap();
        assert_eq!(root.reply_count, 5);
        assert!(root.reactions.is_empty());
        assert!(!root.is_locked);
    }

    #[test]
    fn history_filter_keeps_only_threaded_roots() {
        let messages = vec![
            serde_json::json!({"ts": "1.0", "text": "no thread", "user": "U1"}),
            serde_json::json!({"ts": "2.0", "text": "threaded", "user": "U1", "reply_count": 3}),
        ];
        let roots: Vec<ThreadRoot> = messages
            .into_iter()
            .filter_map(|raw| serde_json::from_value::<ThreadRoot>(raw).ok())
            .filter(|root| root.reply_count > 0)
            .collect();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].ts, "2.0");
    }

    #[test]
    fn envelope_error_maps_to_api_error() {
        let envelope: SlackEnvelope =
            serde_json::from_str(r#"{"ok": false, "error": "channel_not_found"}"#).unwrap();
        let err = SlackClient::check_envelope("conversations.history", envelope).unwrap_err();
        match err {
            ChatError::Api { method, code } => {
                assert_eq!(method, "conversations.history");
                assert_eq!(code, "channel_not_found");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn user_display_name_prefers_real_name() {
        let user: SlackUser = serde_json::from_str(
            r#"{"id": "U1", "name": "jdoe", "real_name": "John Doe"}"#,
        )
        .unwrap();
        assert_eq!(user.display_name(), "John Doe");

        let no_real: SlackUser = serde_json::from_str(r#"{"id": "U2", "name": "jdoe"}"#).unwrap();
        assert_eq!(no_real.display_name(), "jdoe");
    }
}
