//! Kubernetes execution backend: one short-lived Job per workspace.
//!
//! Each Job runs a curl container that calls back into the service's
//! analyze endpoint, so analysis work is isolated and retried by the
//! cluster instead of in-process.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::KubernetesConfig;
use crate::dispatch::ExecutionBackend;
use crate::error::DispatchError;

const JOB_LABEL_SELECTOR: &str = "app=threadwise,component=workspace-analyzer";
/// Curl gets five minutes before the Job counts as failed.
const CALLBACK_TIMEOUT_SECS: u32 = 300;

/// Build a batch/v1 Job manifest for one workspace analysis.
///
/// Job names embed the workspace id and a millisecond timestamp so repeated
/// cycles never collide, lowercased to satisfy DNS-1123 naming.
pub fn build_job_manifest(
    config: &KubernetesConfig,
    api_url: &str,
    workspace_id: &str,
    now: DateTime<Utc>,
) -> Value {
    let job_name =
        format!("workspace-analyzer-{}-{}", workspace_id, now.timestamp_millis()).to_lowercase();
    let callback = format!("{api_url}/api/workspaces/{workspace_id}/analyze");

    json!({
        "apiVersion": "batch/v1",
        "kind": "Job",
        "metadata": {
            "name": job_name,
            "namespace": config.namespace,
            "labels": {
                "app": "threadwise",
                "component": "workspace-analyzer",
                "workspaceId": workspace_id,
            },
        },
        "spec": {
            "ttlSecondsAfterFinished": config.ttl_seconds_after_finished,
            "backoffLimit": config.backoff_limit,
            "template": {
                "metadata": {
                    "labels": {
                        "app": "threadwise",
                        "component": "workspace-analyzer",
                        "workspaceId": workspace_id,
                    },
                },
                "spec": {
                    "restartPolicy": "Never",
                    "containers": [{
                        "name": "workspace-analyzer",
                        "image": format!("{}:{}", config.image_name, config.image_tag),
                        "command": [
                            "curl",
                            "-sf",
                            "-X", "POST",
                            "--max-time", CALLBACK_TIMEOUT_SECS.to_string(),
                            callback,
                        ],
                        "resources": {
                            "requests": {
                                "memory": config.memory_request,
                                "cpu": config.cpu_request,
                            },
                            "limits": {
                                "memory": config.memory_limit,
                                "cpu": config.cpu_limit,
                            },
                        },
                    }],
                },
            },
        },
    })
}

/// Submits workspace analyses as Kubernetes Jobs via the batch API.
pub struct KubernetesBackend {
    client: reqwest::Client,
    config: KubernetesConfig,
    api_url: String,
}

impl KubernetesBackend {
    pub fn new(config: KubernetesConfig, api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            api_url,
        }
    }

    fn jobs_url(&self) -> String {
        format!(
            "{}/apis/batch/v1/namespaces/{}/jobs",
            self.config.api_url, self.config.namespace
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Whether a finished job is past its retention window.
    ///
    /// Successful jobs carry `status.completionTime`; failed ones do not,
    /// so their finish time comes from the `Failed` condition's
    /// `lastTransitionTime`.
    fn is_reclaimable(&self, job: &Value, now: DateTime<Utc>) -> bool {
        let Some(finished) = Self::finished_at(job) else {
            return false;
        };
        let Ok(ttl_secs) = i64::try_from(self.config.ttl_seconds_after_finished) else {
            return false;
        };
        now - finished > ChronoDuration::seconds(ttl_secs)
    }

    fn finished_at(job: &Value) -> Option<DateTime<Utc>> {
        let status = &job["status"];
        if status["succeeded"].as_u64().unwrap_or(0) > 0 {
            return status["completionTime"]
                .as_str()
                .and_then(|t| t.parse().ok());
        }
        status["conditions"]
            .as_array()?
            .iter()
            .find(|c| c["type"] == "Failed" && c["status"] == "True")
            .and_then(|c| c["lastTransitionTime"].as_str())
            .and_then(|t| t.parse().ok())
    }
}

#[async_trait::async_trait]
impl ExecutionBackend for KubernetesBackend {
    async fn dispatch(&self, workspace_id: &str) -> Result<(), DispatchError> {
        let manifest = build_job_manifest(&self.config, &self.api_url, workspace_id, Utc::now());
        debug!(workspace_id, job = %manifest["metadata"]["name"], "Submitting analyzer job");

        let response = self
            .authorize(self.client.post(self.jobs_url()))
            .json(&manifest)
            .send()
            .await
            .map_err(|e| DispatchError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::SubmitFailed {
                workspace_id: workspace_id.to_string(),
                reason: format!("Kubernetes API returned {status}: {body}"),
            });
        }

        info!(workspace_id, "Analyzer job submitted");
        Ok(())
    }

    /// Best-effort deletion of finished analyzer jobs past their TTL.
    /// Covers clusters without the TTL controller; failures are logged only.
    async fn reclaim(&self) {
        let list = self
            .authorize(self.client.get(self.jobs_url()))
            .query(&[("labelSelector", JOB_LABEL_SELECTOR)])
            .send()
            .await;

        let jobs: Value = match list {
            Ok(response) => match response.json().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(error = %e, "Failed to parse job list during reclaim");
                    return;
                }
            },
            Err(e) => {
                warn!(error = %e, "Failed to list analyzer jobs during reclaim");
                return;
            }
        };

        let now = Utc::now();
        let items = jobs["items"].as_array().cloned().unwrap_or_default();
        for job in items.iter().filter(|j| self.is_reclaimable(j, now)) {
            let Some(name) = job["metadata"]["name"].as_str() else {
                continue;
            };
            let url = format!("{}/{}", self.jobs_url(), name);
            let result = self
                .authorize(self.client.delete(&url))
                .query(&[("propagationPolicy", "Background")])
                .send()
                .await;
            match result {
                Ok(response) if response.status().is_success() => {
                    info!(job = name, "Reclaimed finished analyzer job");
                }
                Ok(response) => {
                    warn!(job = name, status = %response.status(), "Failed to delete job");
                }
                Err(e) => {
                    warn!(job = name, error = %e, "Failed to delete job");
                }
            }
        }
    }
}
