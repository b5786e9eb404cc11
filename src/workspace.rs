//! Workspace records and the store that resolves them.
//!
//! The pipeline only ever sees the [`WorkspaceStore`] trait, so the static
//! in-memory store can be swapped for a durable backend without touching
//! the analyzer or dispatcher.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Per-workspace analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    /// Threads with strictly more replies than this are analyzed.
    pub thread_threshold: u32,
}

/// A chat workspace and the channels we scan in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub channels: Vec<String>,
    pub settings: WorkspaceSettings,
}

/// Resolves workspace records by id and lists all active workspaces.
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    async fn get(&self, workspace_id: &str) -> Result<Workspace, AnalysisError>;
    async fn list_all(&self) -> Vec<Workspace>;
}

/// Static store backed by a fixed list built at startup.
pub struct StaticWorkspaceStore {
    workspaces: Vec<Workspace>,
}

impl StaticWorkspaceStore {
    pub fn new(workspaces: Vec<Workspace>) -> Self {
        Self { workspaces }
    }

    /// Single default workspace scanning one channel.
    pub fn single(channel_id: String, thread_threshold: u32) -> Self {
        Self::new(vec![Workspace {
            id: "default".to_string(),
            channels: vec![channel_id],
            settings: WorkspaceSettings { thread_threshold },
        }])
    }
}

#[async_trait]
impl WorkspaceStore for StaticWorkspaceStore {
    async fn get(&self, workspace_id: &str) -> Result<Workspace, AnalysisError> {
        self.workspaces
            .iter()
            .find(|w| w.id == workspace_id)
            .cloned()
            .ok_or_else(|| AnalysisError::WorkspaceNotFound(workspace_id.to_string()))
    }

    async fn list_all(&self) -> Vec<Workspace> {
        self.workspaces.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_store_resolves_by_id() {
        let store = StaticWorkspaceStore::single("C123".into(), 2);
        let ws = store.get("default").await.unwrap();
        assert_eq!(ws.channels, vec!["C123".to_string()]);
        assert_eq!(ws.settings.thread_threshold, 2);
    }

    #[tokio::test]
    async fn static_store_unknown_id_errors() {
        let store = StaticWorkspaceStore::single("C123".into(), 2);
        let err = store.get("missing").await.unwrap_err();
        assert!(matches!(err, AnalysisError::WorkspaceNotFound(_)));
    }

    #[tokio::test]
    async fn static_store_lists_all() {
        let store = StaticWorkspaceStore::single("C123".into(), 2);
        assert_eq!(store.list_all().await.len(), 1);
    }
}
