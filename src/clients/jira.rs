//! Jira ticketing client and the per-workspace credential registry.
//!
//! The registry is an explicitly constructed component owned by the
//! application assembly: workspace id -> client, with one global fallback.
//! No ambient singleton lookup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;

use crate::analysis::types::ExtractedTask;
use crate::config::JiraConfig;
use crate::error::TicketError;

/// Creates one tracking issue from an extracted task.
#[async_trait]
pub trait TicketClient: Send + Sync {
    /// Returns the created issue key.
    async fn create_issue(&self, task: &ExtractedTask) -> Result<String, TicketError>;
}

/// Maps workspace ids to their ticket client, with a global fallback.
pub struct TicketRegistry {
    workspace_clients: HashMap<String, Arc<dyn TicketClient>>,
    fallback: Option<Arc<dyn TicketClient>>,
}

impl TicketRegistry {
    pub fn new(fallback: Option<Arc<dyn TicketClient>>) -> Self {
        Self {
            workspace_clients: HashMap::new(),
            fallback,
        }
    }

    /// Register a workspace-specific client.
    pub fn register_workspace(&mut self, workspace_id: String, client: Arc<dyn TicketClient>) {
        self.workspace_clients.insert(workspace_id, client);
    }

    fn client_for(&self, workspace_id: &str) -> Result<&Arc<dyn TicketClient>, TicketError> {
        self.workspace_clients
            .get(workspace_id)
            .or(self.fallback.as_ref())
            .ok_or_else(|| TicketError::NoConfig {
                workspace_id: workspace_id.to_string(),
            })
    }

    /// Create one issue, resolved against the workspace's credential set.
    pub async fn create_issue(
        &self,
        workspace_id: &str,
        task: &ExtractedTask,
    ) -> Result<String, TicketError> {
        let client = self.client_for(workspace_id)?;
        let key = client.create_issue(task).await?;
        tracing::info!(workspace_id, issue_key = %key, "Created tracking issue");
        Ok(key)
    }
}

/// Jira Cloud REST implementation of [`TicketClient`].
pub struct JiraClient {
    client: reqwest::Client,
    config: JiraConfig,
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl TicketClient for JiraClient {
    async fn create_issue(&self, task: &ExtractedTask) -> Result<String, TicketError> {
        let body = serde_json::json!({
            "fields": {
                "project": { "key": self.config.project_key },
                "summary": task.summary,
                "description": task.description,
                "issuetype": { "name": "Task" },
            }
        });

        let url = format!("{}/rest/api/3/issue", self.config.base_url);
        let resp = self
            .client
            .post(&url)
            .basic_auth(
                &self.config.email,
                Some(self.config.api_token.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| TicketError::CreateFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TicketError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let created: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| TicketError::CreateFailed(e.to_string()))?;

        created["key"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| TicketError::CreateFailed("response missing issue key".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingClient {
        label: &'static str,
    }

    #[async_trait]
    impl TicketClient for RecordingClient {
        async fn create_issue(&self, _task: &ExtractedTask) -> Result<String, TicketError> {
            Ok(format!("{}-1", self.label))
        }
    }

    fn task() -> ExtractedTask {
        ExtractedTask {
            summary: "Fix login timeout".to_string(),
            description: serde_json::json!({"type": "doc", "version": 1, "content": []}),
        }
    }

    #[tokio::test]
    async fn registry_prefers_workspace_client() {
        let mut registry = TicketRegistry::new(Some(Arc::new(RecordingClient { label: "FB" })));
        registry.register_workspace("acme".into(), Arc::new(RecordingClient { label: "ACME" }));

        assert_eq!(registry.create_issue("acme", &task()).await.unwrap(), "ACME-1");
        assert_eq!(registry.create_issue("other", &task()).await.unwrap(), "FB-1");
    }

    #[tokio::test]
    async fn registry_without_config_errors() {
        let registry = TicketRegistry::new(None);
        let err = registry.create_issue("acme", &task()).await.unwrap_err();
        assert!(matches!(err, TicketError::NoConfig { .. }));
    }
}
