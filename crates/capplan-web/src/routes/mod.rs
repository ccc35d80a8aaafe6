//! Route handlers.

pub mod quarters;

use axum::{http::StatusCode, Json};
use capplan_core::CapError;
use serde_json::{json, Value};

/// Map a domain error onto an HTTP status and message.
pub(crate) fn error_response(err: CapError) -> (StatusCode, String) {
    let status = match &err {
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        CapError::ValidationError(_) | CapError::Json(_) => StatusCode::BAD_REQUEST,
        CapError::InvalidState(_) | CapError::Rejected(_) => StatusCode::CONFLICT,
        CapError::Transport(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    }
    (status, err.to_string())
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
