//! Mirror Daemon library
//!
//! This module provides the core components for the mirror daemon:
//! - Webhook dispatch onto the channel directory
//! - REST API handlers
//! - Server lifecycle management

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod server;

pub use config::DaemonConfig;
pub use dispatch::{DispatchOutcome, Dispatcher, EventKind, WebhookEvent};
pub use error::{ApiError, DaemonError, DaemonResult};
pub use server::Server;
