//! Execution dispatch: how each cron cycle runs workspace analyses.
//!
//! Two interchangeable backends sit behind [`ExecutionBackend`]: a direct
//! loopback HTTP call into our own analyze endpoint, and a Kubernetes Job
//! submitter for isolated per-workspace runs. Success here means the work
//! was *submitted*, not that analysis finished.

mod direct;
mod kubernetes;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use tracing::warn;

pub use direct::DirectBackend;
pub use kubernetes::{KubernetesBackend, build_job_manifest};

use crate::config::{AppConfig, ExecutionMode};
use crate::error::DispatchError;

/// Per-workspace dispatch result. Errors are carried as strings so a whole
/// batch serializes cleanly into the cron cycle log.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub workspace_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Strategy for executing one cycle's workspace analyses.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Submit analysis of one workspace.
    async fn dispatch(&self, workspace_id: &str) -> Result<(), DispatchError>;

    /// Submit every workspace concurrently and settle all of them.
    ///
    /// One failed submission never cancels the rest; the result always has
    /// exactly one entry per requested workspace.
    async fn dispatch_all(&self, workspace_ids: &[String]) -> Vec<DispatchOutcome> {
        let submissions = workspace_ids.iter().map(|id| async move {
            match self.dispatch(id).await {
                Ok(()) => DispatchOutcome {
                    workspace_id: id.clone(),
                    success: true,
                    error: None,
                },
                Err(err) => {
                    warn!(workspace_id = %id, error = %err, "Dispatch failed");
                    DispatchOutcome {
                        workspace_id: id.clone(),
                        success: false,
                        error: Some(err.to_string()),
                    }
                }
            }
        });
        join_all(submissions).await
    }

    /// Clean up finished execution artifacts. No-op for backends without any.
    async fn reclaim(&self) {}
}

/// Build the backend selected by `EXECUTION_MODE`.
pub fn backend_for(config: &AppConfig) -> Result<Arc<dyn ExecutionBackend>, DispatchError> {
    Ok(match config.execution_mode {
        ExecutionMode::Direct => Arc::new(DirectBackend::new(
            config.api_url.clone(),
            config.dispatch_timeout,
        )?),
        ExecutionMode::Kubernetes => Arc::new(KubernetesBackend::new(
            config.kubernetes.clone(),
            config.api_url.clone(),
        )),
    })
}
