//! Chat Web API transport
//!
//! [`SlackClient`] implements the channel directory's remote traits
//! ([`ChannelApi`](mirror_directory::ChannelApi),
//! [`UserDirectoryApi`](mirror_directory::UserDirectoryApi) and
//! [`MessageApi`](mirror_directory::MessageApi)) over a Slack-style Web API:
//! every method is a form-encoded `POST {base_url}/{method}` authenticated
//! with a bearer token, answered by a JSON envelope carrying `ok` and, on
//! failure, an `error` code.

#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
mod wire;

pub use client::SlackClient;
pub use config::SlackConfig;
pub use error::{ChatError, ChatResult};
