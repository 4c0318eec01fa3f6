// Export route modules
pub mod health;
pub mod query;
pub mod tools;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub const NOT_INITIALIZED: &str = "Tool session not initialized";

/// An error body in the `{"detail": ...}` shape clients expect
pub fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": detail.into() }))).into_response()
}

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(health::routes(state.clone()))
        .merge(query::routes(state.clone()))
        .merge(tools::routes(state))
}
