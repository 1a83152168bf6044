//! HTTP API server for the Chorus gateway
//!
//! Exposes the voice-turn operations, the text chat endpoint and the
//! health/config probes consumed by the frontend.

pub mod chat;
pub mod health;
pub mod voice;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::turn::{Responder, TurnController};
use crate::{Error, Result};

/// Shared state for API handlers
pub struct ApiState {
    /// The voice-turn lifecycle controller
    pub controller: Arc<TurnController>,
    /// Responder used directly by the text chat endpoint
    pub responder: Arc<dyn Responder>,
    pub llm_model: String,
    pub stt_model: String,
    pub record_secs: u64,
    pub system_prompt: String,
}

/// Build the router with all routes
pub fn router(state: Arc<ApiState>) -> Router {
    let router = Router::new()
        .nest("/voice", voice::router(state.clone()))
        .merge(chat::router(state.clone()))
        .merge(health::router(state));

    // CORS layer for cross-origin requests from the frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router.layer(cors).layer(TraceLayer::new_for_http())
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Create a server for the given state and port
    #[must_use]
    pub const fn new(state: Arc<ApiState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, router(self.state))
            .await
            .map_err(|e| Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

/// API errors mapped onto HTTP responses
#[derive(Debug)]
pub enum ApiError {
    /// Operation requested in the wrong turn state
    Conflict(String),
    /// Malformed request
    BadRequest(&'static str),
    /// An upstream collaborator (LLM) failed
    Upstream(String),
    /// Synchronous bookkeeping failed
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Conflict(msg) => Self::Conflict(msg.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(serde::Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(serde::Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.to_string()),
            Self::Upstream(msg) => (StatusCode::BAD_GATEWAY, "generation_failed", msg),
            Self::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "operation_failed", msg)
            }
        };

        (status, Json(ErrorResponse {
            error: ErrorBody { code, message },
        }))
            .into_response()
    }
}
