use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;

use super::{error_response, NOT_INITIALIZED};
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct ToolEntry {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct ToolsResponse {
    tools: Vec<ToolEntry>,
}

async fn list_tools(State(state): State<AppState>) -> Response {
    let Some(agent) = state.agent().await else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, NOT_INITIALIZED);
    };

    match agent.tools().await {
        Ok(tools) => Json(ToolsResponse {
            tools: tools
                .into_iter()
                .map(|tool| ToolEntry {
                    name: tool.name,
                    description: tool.description,
                    parameters: tool.input_schema,
                })
                .collect(),
        })
        .into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error listing tools: {}", e),
        ),
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/tools", get(list_tools))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{get, send, state_with, summons_tools};
    use crate::state::AppState;

    #[tokio::test]
    async fn test_list_tools() {
        let state = state_with(Some("hi"), Some(summons_tools())).await;
        let (status, body) = send(state, get("/tools")).await;
        assert_eq!(status, 200);
        assert_eq!(body["tools"][0]["name"], "pay_summons");
        assert_eq!(
            body["tools"][0]["parameters"]["properties"]["summons_id"]["type"],
            "string"
        );
    }

    #[tokio::test]
    async fn test_list_tools_failure() {
        let state = state_with(Some("hi"), None).await;
        let (status, body) = send(state, get("/tools")).await;
        assert_eq!(status, 500);
        assert_eq!(
            body["detail"],
            "Error listing tools: Tool server unreachable: connection refused"
        );
    }

    #[tokio::test]
    async fn test_list_tools_uninitialized() {
        let (status, _) = send(AppState::new(), get("/tools")).await;
        assert_eq!(status, 503);
    }
}
