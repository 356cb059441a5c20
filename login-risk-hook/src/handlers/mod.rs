//! HTTP handlers for the hook endpoint and operational routes.

pub mod hooks;
pub mod metrics;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "login-risk-hook" })),
    )
}
