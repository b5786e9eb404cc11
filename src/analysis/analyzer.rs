//! Workspace-level analysis orchestration.
//!
//! One `analyze` call covers one workspace: channels iterate sequentially,
//! thread faults are absorbed and logged. `analyze_all` fans out over all
//! registered workspaces in chunks of [`CHUNK_SIZE`], chunks strictly
//! sequential so a large fleet cannot exhaust chat API rate limits.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::analysis::pipeline::{ThreadOutcome, ThreadProcessor, UserNameCache, should_process};
use crate::clients::slack::ChatClient;
use crate::error::AnalysisError;
use crate::workspace::WorkspaceStore;

/// Upper bound on workspaces analyzed concurrently within one batch.
const CHUNK_SIZE: usize = 5;

/// Outcome of one workspace run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub workspace_id: String,
    /// Threads that completed the pipeline (including casual-chat skips).
    pub processed_threads: usize,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisResult {
    fn empty(workspace_id: &str) -> Self {
        Self {
            workspace_id: workspace_id.to_string(),
            processed_threads: 0,
            timestamp: Utc::now(),
        }
    }
}

/// Drives thread analysis across a workspace's channels.
pub struct WorkspaceAnalyzer {
    chat: Arc<dyn ChatClient>,
    processor: ThreadProcessor,
    store: Arc<dyn WorkspaceStore>,
}

impl WorkspaceAnalyzer {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        processor: ThreadProcessor,
        store: Arc<dyn WorkspaceStore>,
    ) -> Self {
        Self {
            chat,
            processor,
            store,
        }
    }

    /// Analyze every channel of one workspace.
    ///
    /// Fatal only when the workspace is unknown, the user listing fails, or
    /// a channel's thread listing fails. Individual thread faults are logged
    /// and skipped.
    pub async fn analyze(&self, workspace_id: &str) -> Result<AnalysisResult, AnalysisError> {
        let workspace = self.store.get(workspace_id).await?;
        info!(workspace_id, channels = workspace.channels.len(), "Starting workspace analysis");

        let names = self
            .chat
            .list_users(workspace_id)
            .await
            .map_err(|source| AnalysisError::UserListing {
                workspace_id: workspace_id.to_string(),
                source,
            })?;
        let mut cache = UserNameCache::new(names);

        let mut processed = 0usize;
        for channel_id in &workspace.channels {
            let roots = self
                .chat
                .list_thread_roots(channel_id, workspace_id)
                .await
                .map_err(|source| AnalysisError::ChannelListing {
                    channel_id: channel_id.clone(),
                    source,
                })?;

            for root in roots
                .iter()
                .filter(|r| should_process(r, &workspace.settings))
            {
                match self
                    .processor
                    .process(root, channel_id, &workspace, &mut cache)
                    .await
                {
                    Ok(ThreadOutcome::Skipped) => {
                        processed += 1;
                    }
                    Ok(ThreadOutcome::Posted {
                        status,
                        tickets_created,
                    }) => {
                        processed += 1;
                        info!(
                            workspace_id,
                            channel_id,
                            thread_ts = %root.ts,
                            ?status,
                            tickets_created,
                            "Thread summarized"
                        );
                    }
                    Err(err) => {
                        warn!(
                            workspace_id,
                            channel_id,
                            thread_ts = %root.ts,
                            error = %err,
                            "Thread processing failed, skipping"
                        );
                    }
                }
            }
        }

        info!(workspace_id, processed, "Workspace analysis complete");
        Ok(AnalysisResult {
            workspace_id: workspace_id.to_string(),
            processed_threads: processed,
            timestamp: Utc::now(),
        })
    }

    /// Analyze every registered workspace.
    ///
    /// Always returns one entry per workspace: a failed run yields a
    /// zero-processed entry rather than dropping out of the batch.
    pub async fn analyze_all(&self) -> Vec<AnalysisResult> {
        let workspaces = self.store.list_all().await;
        info!(total = workspaces.len(), "Starting batch analysis");

        let mut results = Vec::with_capacity(workspaces.len());
        for chunk in workspaces.chunks(CHUNK_SIZE) {
            let runs = chunk.iter().map(|ws| async {
                match self.analyze(&ws.id).await {
                    Ok(result) => result,
                    Err(err) => {
                        error!(workspace_id = %ws.id, error = %err, "Workspace analysis failed");
                        AnalysisResult::empty(&ws.id)
                    }
                }
            });
            results.extend(join_all(runs).await);
        }
        results
    }
}
