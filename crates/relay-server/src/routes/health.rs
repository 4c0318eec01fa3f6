use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use super::{error_response, NOT_INITIALIZED};
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct ToolSummary {
    name: String,
    description: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    mcp_connected: bool,
    available_tools: usize,
    tools: Vec<ToolSummary>,
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({"status": "healthy", "message": "relay is running"}))
}

async fn health(State(state): State<AppState>) -> Response {
    let Some(agent) = state.agent().await else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, NOT_INITIALIZED);
    };

    match agent.tools().await {
        Ok(tools) => Json(HealthResponse {
            status: "healthy",
            mcp_connected: true,
            available_tools: tools.len(),
            tools: tools
                .into_iter()
                .map(|tool| ToolSummary {
                    name: tool.name,
                    description: tool.description,
                })
                .collect(),
        })
        .into_response(),
        Err(e) => {
            warn!("health check failed: {}", e);
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Health check failed: {}", e),
            )
        }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{get, send, state_with, summons_tools};
    use crate::state::AppState;

    #[tokio::test]
    async fn test_root() {
        let (status, body) = send(AppState::new(), get("/")).await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_health_reports_tools() {
        let state = state_with(Some("hi"), Some(summons_tools())).await;
        let (status, body) = send(state, get("/health")).await;
        assert_eq!(status, 200);
        assert_eq!(body["mcp_connected"], true);
        assert_eq!(body["available_tools"], 2);
        assert_eq!(body["tools"][0]["name"], "pay_summons");
        assert_eq!(body["tools"][1]["description"], "Renew a driving licence");
    }

    #[tokio::test]
    async fn test_health_uninitialized() {
        let (status, body) = send(AppState::new(), get("/health")).await;
        assert_eq!(status, 503);
        assert_eq!(body["detail"], "Tool session not initialized");
    }

    #[tokio::test]
    async fn test_health_tool_server_down() {
        let state = state_with(Some("hi"), None).await;
        let (status, body) = send(state, get("/health")).await;
        assert_eq!(status, 503);
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .starts_with("Health check failed"));
    }

    #[tokio::test]
    async fn test_health_after_close() {
        let state = state_with(Some("hi"), Some(vec![])).await;
        state.close().await;
        let (status, _) = send(state, get("/health")).await;
        assert_eq!(status, 503);
    }
}
