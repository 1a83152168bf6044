//! Voice turn endpoints: start, stop, status, cancel

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use super::{ApiError, ApiState};
use crate::turn::TurnStatus;

/// Build the voice router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/status", get(status))
        .route("/cancel", post(cancel))
        .with_state(state)
}

/// Response for an accepted start request
#[derive(Serialize)]
struct StartResponse {
    message: &'static str,
    /// Fixed capture duration in seconds
    duration: u64,
}

/// Generic acknowledgement
#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

/// Begin a new voice turn
async fn start(State(state): State<Arc<ApiState>>) -> Result<Json<StartResponse>, ApiError> {
    let started = state.controller.begin_recording()?;
    Ok(Json(StartResponse {
        message: "recording started",
        duration: started.duration_secs,
    }))
}

/// Stop recording and process the captured audio
async fn stop(State(state): State<Arc<ApiState>>) -> Result<Json<MessageResponse>, ApiError> {
    state.controller.end_recording_and_process()?;
    Ok(Json(MessageResponse {
        message: "processing started",
    }))
}

/// Snapshot the turn state
async fn status(State(state): State<Arc<ApiState>>) -> Json<TurnStatus> {
    Json(state.controller.get_status())
}

/// Cancel whatever the turn is doing; always succeeds
async fn cancel(State(state): State<Arc<ApiState>>) -> Json<MessageResponse> {
    state.controller.cancel();
    Json(MessageResponse {
        message: "operation cancelled",
    })
}
