//! Web error types for the demo server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::StateError;

/// Error type for web handlers.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// Bad request with validation error.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Posted state was rejected, or state could not be saved.
    #[error(transparent)]
    State(#[from] StateError),
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match &self {
            WebError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "Bad Request", Some(msg.clone()))
            }
            WebError::State(e) if e.is_client_fault() => {
                tracing::warn!(error = %e, "Rejected posted state");
                (StatusCode::BAD_REQUEST, "Invalid State", Some(e.to_string()))
            }
            WebError::State(e) => {
                tracing::error!("State error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "State Error", None)
            }
        };

        let body = Json(ErrorResponse {
            error: error_message.to_string(),
            details,
        });

        (status, body).into_response()
    }
}
