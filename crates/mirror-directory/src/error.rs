//! Directory error types

use thiserror::Error;

/// Failure reported by the remote chat or user service.
///
/// `message` is the description the service returned (for a Web API
/// `ok: false` response, its `error` code) or the transport failure text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{method} failed: {message}")]
pub struct RemoteError {
    pub method: String,
    pub message: String,
}

impl RemoteError {
    pub fn new(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            message: message.into(),
        }
    }
}

/// Directory errors
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    #[error("Remote API error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Invalid project key: {0:?}")]
    InvalidProjectKey(String),
}

/// Result type for remote calls
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Result type for directory operations
pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;
