//! Channel directory handlers

use crate::api::rest::state::AppState;
use axum::{extract::State, Json};
use mirror_directory::{ChannelEntry, ChannelState};
use serde::Serialize;

/// Cached channel as shown to operators
#[derive(Debug, Serialize)]
pub struct ChannelSummary {
    pub key: String,
    pub channel_id: String,
    pub state: String,
    pub purpose: String,
    pub members: usize,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl From<ChannelEntry> for ChannelSummary {
    fn from(entry: ChannelEntry) -> Self {
        Self {
            state: ChannelState::of(Some(&entry)).to_string(),
            key: entry.key.to_string(),
            channel_id: entry.remote_id,
            purpose: entry.purpose,
            members: entry.members.len(),
            expires_at: entry.expires_at,
        }
    }
}

/// List cached channel entries
pub async fn list_channels(State(state): State<AppState>) -> Json<Vec<ChannelSummary>> {
    let entries = state.dispatcher.directory().snapshot().await;
    Json(entries.into_iter().map(ChannelSummary::from).collect())
}
