//! Chat transport error types

use mirror_directory::RemoteError;
use thiserror::Error;

/// Chat transport errors
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The service answered `ok: false`
    #[error("{0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ChatError {
    /// Convert into the directory's remote error for `method`
    pub fn into_remote(self, method: &str) -> RemoteError {
        RemoteError::new(method, self.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::Decode(e.to_string())
    }
}

/// Result type for chat transport operations
pub type ChatResult<T> = Result<T, ChatError>;
