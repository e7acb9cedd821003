use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors raised outside the streaming phase: configuration loading, request
/// validation and server startup. Anything that happens once a stream is open
/// travels as a `NormalizedEvent::Failure` instead.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Invalid request body")]
    InvalidBody(#[source] serde_json::Error),

    #[error("Invalid messages")]
    InvalidMessages,

    #[error("Invalid message at index {index}: {reason}")]
    InvalidMessage { index: usize, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpError(String),

    #[error("Server error: {0}")]
    ServerError(String),
}

impl RelayError {
    /// HTTP status used when this error is returned to a client.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidBody(_) | Self::InvalidMessages | Self::InvalidMessage { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::ConfigError(_) | Self::HttpError(_) | Self::ServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(error: reqwest::Error) -> Self {
        RelayError::HttpError(error.to_string())
    }
}

impl From<std::io::Error> for RelayError {
    fn from(error: std::io::Error) -> Self {
        RelayError::ServerError(error.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let public_message = match status {
            StatusCode::BAD_REQUEST => self.to_string(),
            _ => "Internal server error".to_string(),
        };
        (status, Json(json!({ "error": public_message }))).into_response()
    }
}
