//! `GET /health` liveness endpoint — not part of the resource-gateway
//! specification proper, but the standard operational surface for any
//! deployable axum service.

use axum::{response::IntoResponse, Json};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
