//! Direct execution backend: loopback HTTP into our own analyze endpoint.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::dispatch::ExecutionBackend;
use crate::error::DispatchError;

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Calls `POST /api/workspaces/{id}/analyze` on this service's own API URL.
/// Dispatch blocks until the analysis responds, bounded by the timeout.
pub struct DirectBackend {
    client: reqwest::Client,
    api_url: String,
}

impl DirectBackend {
    pub fn new(api_url: String, timeout: Duration) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Http(e.to_string()))?;
        Ok(Self { client, api_url })
    }
}


#[async_trait::async_trait]
impl ExecutionBackend for DirectBackend {
    async fn dispatch(&self, workspace_id: &str) -> Result<(), DispatchError> {
        let url = format!("{}/api/workspaces/{}/analyze", self.api_url, workspace_id);
        debug!(workspace_id, %url, "Dispatching direct analysis");

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| DispatchError::Http(e.to_string()))?;

        let status = response.status();
        let body: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| DispatchError::Http(e.to_string()))?;

        if !status.is_success() || !body.success {
            return Err(DispatchError::SubmitFailed {
                workspace_id: workspace_id.to_string(),
                reason: body
                    .error
                    .unwrap_or_else(|| format!("analyze endpoint returned {status}")),
            });
        }

        info!(workspace_id, "Direct analysis completed");
        Ok(())
    }
}
