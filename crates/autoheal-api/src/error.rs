//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use autoheal_engine::EngineError;
use thiserror::Error;

/// Errors returned by control endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A run is already in progress.
    #[error("A run is already in progress")]
    RunActive,

    /// Malformed request body or parameters.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RunActive => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(e) => match e {
                EngineError::AlreadyRunning => StatusCode::CONFLICT,
                EngineError::Source { .. } => StatusCode::BAD_REQUEST,
                EngineError::NoWindow(_) => StatusCode::SERVICE_UNAVAILABLE,
                EngineError::Driver(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
