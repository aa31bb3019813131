//! Application state for API handlers

use crate::dispatch::Dispatcher;
use crate::error::{ApiError, ApiResult};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Event dispatcher
    pub dispatcher: Arc<Dispatcher>,

    /// Webhook shared secret
    pub access_token: Option<String>,

    /// Maximum webhook body size in bytes
    pub max_body_size: usize,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(dispatcher: Arc<Dispatcher>, access_token: Option<String>) -> Self {
        Self {
            dispatcher,
            access_token,
            max_body_size: 1024 * 1024,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Check a webhook token against the configured secret
    pub fn authorize(&self, token: Option<&str>) -> ApiResult<()> {
        match &self.access_token {
            None => Ok(()),
            Some(expected) if token == Some(expected.as_str()) => Ok(()),
            Some(_) => Err(ApiError::Unauthorized),
        }
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let duration = chrono::Utc::now() - self.started_at;
        let secs = duration.num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else if secs < 86400 {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        } else {
            format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
        }
    }
}
