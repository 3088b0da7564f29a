//! Parley: API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parley_core::error::EngineError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Startup errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid, or the
    /// scenarios failed to load.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        Self::Config(err.to_string())
    }
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Whether repeating the same request may succeed.
    pub retryable: bool,
}

/// HTTP-layer wrapper around `EngineError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::Configuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::InvalidSessionState { .. }
            | EngineError::SessionTerminated(_)
            | EngineError::SessionNotComplete(_) => StatusCode::CONFLICT,
            EngineError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::InvalidAction(_) => StatusCode::BAD_REQUEST,
            EngineError::TurnFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::GeneratorUnavailable(_) => StatusCode::BAD_GATEWAY,
            EngineError::GeneratorTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            EngineError::InvalidTurnSequence { .. }
            | EngineError::CorruptedSession { .. }
            | EngineError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(code = self.0.code(), error = %self.0, "request failed");
        }

        let retryable = matches!(self.0, EngineError::TurnFailed { .. }) || self.0.is_retryable();
        let body = ErrorBody {
            error: self.0.code(),
            message: self.0.to_string(),
            retryable,
        };

        (status, Json(body)).into_response()
    }
}
