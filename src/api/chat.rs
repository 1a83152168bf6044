//! Text chat endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiState};

/// Build the chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new().route("/chat", post(chat)).with_state(state)
}

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    message: String,
    response: String,
    /// Seconds since the Unix epoch
    timestamp: f64,
}

/// Send a text message straight to the responder
async fn chat(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = request.message.trim().to_string();
    if message.is_empty() {
        return Err(ApiError::BadRequest("empty message"));
    }

    let response = state
        .responder
        .respond(&message)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    #[allow(clippy::cast_precision_loss)]
    let timestamp = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;

    Ok(Json(ChatResponse {
        message,
        response,
        timestamp,
    }))
}
