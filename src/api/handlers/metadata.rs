//! `GET /fhir/metadata` capability document (§4.8, §6).

use axum::{extract::State, response::IntoResponse, Json};

use crate::state::AppState;

pub async fn capability_statement(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.conformance.capability_statement().clone())
}
