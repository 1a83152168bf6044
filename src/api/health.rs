//! Health and configuration endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use super::ApiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub llm_model: String,
    pub stt_model: String,
}

/// Effective configuration exposed to the frontend
#[derive(Serialize)]
pub struct ConfigResponse {
    pub llm_model: String,
    pub stt_model: String,
    pub record_seconds: u64,
    pub system_prompt: String,
}

/// Liveness probe
async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        llm_model: state.llm_model.clone(),
        stt_model: state.stt_model.clone(),
    })
}

/// Current configuration
async fn config(State(state): State<Arc<ApiState>>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        llm_model: state.llm_model.clone(),
        stt_model: state.stt_model.clone(),
        record_seconds: state.record_secs,
        system_prompt: state.system_prompt.clone(),
    })
}

/// Build the health router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/config", get(config))
        .with_state(state)
}
