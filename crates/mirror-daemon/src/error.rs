//! Error types for mirror-daemon

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mirror_chat::ChatError;
use mirror_directory::DirectoryError;
use serde::Serialize;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// Chat transport setup error
    #[error("Chat client error: {0}")]
    Chat(#[from] ChatError),

    /// Directory error
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or wrong webhook token
    #[error("Unauthorized")]
    Unauthorized,

    /// Event kind the daemon does not handle
    #[error("Unsupported event: {0}")]
    UnsupportedEvent(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Reconciliation against the chat service failed
    #[error("Reconciliation failed: {0}")]
    Reconciliation(DirectoryError),
}

impl From<DirectoryError> for ApiError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::InvalidProjectKey(_) => ApiError::BadRequest(e.to_string()),
            other => ApiError::Reconciliation(other),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::UnsupportedEvent(_) => (StatusCode::NOT_IMPLEMENTED, "UNSUPPORTED_EVENT"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Reconciliation(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "RECONCILIATION_FAILED")
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
