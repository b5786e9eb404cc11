//! REST endpoints for health checks and on-demand workspace analysis.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use tracing::{error, info};

use crate::analysis::WorkspaceAnalyzer;
use crate::config::Environment;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<WorkspaceAnalyzer>,
    pub environment: Environment,
}

/// Build the Axum router with health and analysis routes.
pub fn api_routes(analyzer: Arc<WorkspaceAnalyzer>, environment: Environment) -> Router {
    let state = AppState {
        analyzer,
        environment,
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/workspaces/{workspace_id}/analyze", post(analyze_workspace))
        .fallback(not_found)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn log_request(request: Request, next: Next) -> impl IntoResponse {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    info!(%method, path, status = %response.status(), "Request handled");
    response
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "environment": state.environment.as_str(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

// ── Analysis ────────────────────────────────────────────────────────────

async fn analyze_workspace(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
) -> impl IntoResponse {
    info!(workspace_id, "Analysis requested");
    match state.analyzer.analyze(&workspace_id).await {
        Ok(result) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "result": result,
            })),
        ),
        Err(err) => {
            error!(workspace_id, error = %err, "Analysis failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "error": err.to_string(),
                })),
            )
        }
    }
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "success": false,
            "error": "Endpoint not found",
        })),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::analysis::{Classifier, ThreadProcessor};
    use crate::clients::jira::TicketRegistry;
    use crate::clients::slack::{ChatClient, RawMessage, ThreadRoot};
    use crate::error::{ChatError, ModelError};
    use crate::llm::{ChatMessage, Completion, ModelClient};
    use crate::workspace::StaticWorkspaceStore;

    struct CasualModel;

    #[async_trait]
    impl ModelClient for CasualModel {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<Completion, ModelError> {
            Ok(Completion {
                content: r#"{"category": "casual_chat", "tone": "playful", "resolution": "not_applicable"}"#
                    .to_string(),
            })
        }
    }

    struct EmptyChat;

    #[async_trait]
    impl ChatClient for EmptyChat {
        async fn list_users(
            &self,
            _workspace_id: &str,
        ) -> Result<HashMap<String, String>, ChatError> {
            Ok(HashMap::new())
        }

        async fn list_thread_roots(
            &self,
            _channel_id: &str,
            _workspace_id: &str,
        ) -> Result<Vec<ThreadRoot>, ChatError> {
            Ok(vec![])
        }

        async fn list_messages(
            &self,
            _channel_id: &str,
            _thread_ts: &str,
            _workspace_id: &str,
        ) -> Result<Vec<RawMessage>, ChatError> {
            Ok(vec![])
        }

        async fn resolve_user_name(
            &self,
            user_id: &str,
            _workspace_id: &str,
        ) -> Result<String, ChatError> {
            Ok(user_id.to_string())
        }

        async fn post_reply(
            &self,
            _channel_id: &str,
            _thread_ts: &str,
            _workspace_id: &str,
            _body: &serde_json::Value,
            _fallback_text: &str,
        ) -> Result<(), ChatError> {
            Ok(())
        }

        async fn add_resolution_marker(
            &self,
            _channel_id: &str,
            _thread_ts: &str,
            _workspace_id: &str,
        ) -> Result<(), ChatError> {
            Ok(())
        }
    }

    fn app() -> Router {
        let chat = Arc::new(EmptyChat);
        let processor = ThreadProcessor::new(
            chat.clone(),
            Classifier::new(Arc::new(CasualModel)),
            Arc::new(TicketRegistry::new(None)),
        );
        let store = Arc::new(StaticWorkspaceStore::single("C1".into(), 2));
        let analyzer = Arc::new(WorkspaceAnalyzer::new(chat, processor, store));
        api_routes(analyzer, Environment::Development)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_environment() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["environment"], "development");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn analyze_known_workspace_succeeds() {
        let response = app()
            .oneshot(
                Request::post("/api/workspaces/default/analyze")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["result"]["workspace_id"], "default");
        assert_eq!(body["result"]["processed_threads"], 0);
    }

    #[tokio::test]
    async fn analyze_unknown_workspace_returns_500() {
        let response = app()
            .oneshot(
                Request::post("/api/workspaces/missing/analyze")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn unknown_route_returns_structured_404() {
        let response = app()
            .oneshot(Request::get("/api/nothing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Endpoint not found");
    }
}
