//! Health endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub session_store: String,
    pub agent_mode: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/health", get(health_check))
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        session_store: state.store_backend.to_string(),
        agent_mode: state.settings.agent_mode.clone(),
    })
}
