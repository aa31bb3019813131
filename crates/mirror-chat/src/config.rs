//! Chat transport configuration

use serde::{Deserialize, Serialize};

/// Chat Web API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Base URL of the Web API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bot token
    #[serde(default)]
    pub token: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Display name used when posting messages
    #[serde(default = "default_bot_username")]
    pub bot_username: String,

    /// Page size for list calls
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
            timeout_secs: default_timeout(),
            bot_username: default_bot_username(),
            page_size: default_page_size(),
        }
    }
}

fn default_base_url() -> String {
    "https://slack.com/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_bot_username() -> String {
    "Jira-Bot".to_string()
}

fn default_page_size() -> u32 {
    200
}
