//! Scheduled analysis cycles.
//!
//! A cycle lists all registered workspaces, dispatches each one through the
//! configured execution backend, logs the batch outcome, then reclaims
//! finished execution artifacts. A reentrancy flag skips a tick that fires
//! while the previous cycle is still running; skipped ticks are not queued.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::Utc;
use cron::Schedule;
use tracing::{error, info, warn};

use crate::config::CronConfig;
use crate::dispatch::ExecutionBackend;
use crate::error::ConfigError;
use crate::workspace::WorkspaceStore;

pub struct CronOrchestrator {
    backend: Arc<dyn ExecutionBackend>,
    store: Arc<dyn WorkspaceStore>,
    running: AtomicBool,
}

impl CronOrchestrator {
    pub fn new(backend: Arc<dyn ExecutionBackend>, store: Arc<dyn WorkspaceStore>) -> Self {
        Self {
            backend,
            store,
            running: AtomicBool::new(false),
        }
    }

    /// Run one analysis cycle, or skip if one is already in flight.
    pub async fn trigger(&self) {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Previous analysis cycle still running, skipping this tick");
            return;
        }

        let started = Instant::now();
        let workspaces = self.store.list_all().await;
        let ids: Vec<String> = workspaces.into_iter().map(|ws| ws.id).collect();
        info!(workspaces = ids.len(), "Starting analysis cycle");

        let outcomes = self.backend.dispatch_all(&ids).await;
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        let failed = outcomes.len() - succeeded;
        if failed > 0 {
            for outcome in outcomes.iter().filter(|o| !o.success) {
                error!(
                    workspace_id = %outcome.workspace_id,
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "Workspace dispatch failed"
                );
            }
        }
        info!(
            succeeded,
            failed,
            duration_ms = started.elapsed().as_millis() as u64,
            "Analysis cycle complete"
        );

        self.backend.reclaim().await;
        self.running.store(false, Ordering::SeqCst);
    }

    /// Validate the schedule and spawn the ticker task.
    pub fn start(self: Arc<Self>, config: &CronConfig) -> Result<(), ConfigError> {
        let schedule = parse_schedule(&config.schedule)?;
        info!(schedule = %config.schedule, "Cron orchestrator enabled");

        if config.run_on_start {
            let orchestrator = self.clone();
            tokio::spawn(async move {
                orchestrator.trigger().await;
            });
        }

        tokio::spawn(async move {
            loop {
                let Some(next) = schedule.upcoming(Utc).next() else {
                    error!("Cron schedule yields no further ticks, stopping");
                    break;
                };
                let wait = (next - Utc::now()).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;
                self.trigger().await;
            }
        });
        Ok(())
    }
}

/// Parse a cron expression, accepting the classic five-field form by
/// prepending a zero seconds field.
fn parse_schedule(expression: &str) -> Result<Schedule, ConfigError> {
    let normalized = if expression.split_whitespace().count() == 5 {
        format!("0 {expression}")
    } else {
        expression.to_string()
    };
    Schedule::from_str(&normalized).map_err(|e| ConfigError::InvalidCronExpression {
        expression: expression.to_string(),
        message: e.to_string(),
    })
}
