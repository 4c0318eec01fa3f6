use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{error_response, NOT_INITIALIZED};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
}

#[derive(Debug, Serialize)]
struct QueryResponse {
    response: String,
}

async fn query(State(state): State<AppState>, Json(request): Json<QueryRequest>) -> Response {
    let Some(agent) = state.agent().await else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, NOT_INITIALIZED);
    };

    info!("processing query: {}", request.query);
    match agent.reply(&request.query).await {
        Ok(answer) => Json(QueryResponse {
            response: answer.text,
        })
        .into_response(),
        Err(e) => {
            error!("query failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error processing query: {}", e),
            )
        }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/query", post(query))
        .with_state(state)
}
