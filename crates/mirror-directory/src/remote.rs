//! Remote chat service capabilities
//!
//! The reconciliation engine only talks to the chat service through these
//! traits. Every call either succeeds or fails with a [`RemoteError`]; the
//! engine treats all failures the same way and never retries.

use crate::error::RemoteResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Web API method names, shared by transports and the in-memory backend.
pub mod methods {
    pub const LIST_CHANNELS: &str = "channels.list";
    pub const CHANNEL_INFO: &str = "channels.info";
    pub const CREATE_CHANNEL: &str = "channels.create";
    pub const UNARCHIVE_CHANNEL: &str = "channels.unarchive";
    pub const JOIN_CHANNEL: &str = "channels.join";
    pub const SET_PURPOSE: &str = "channels.setPurpose";
    pub const ARCHIVE_CHANNEL: &str = "channels.archive";
    pub const INVITE_USER: &str = "channels.invite";
    pub const LIST_USERS: &str = "users.list";
    pub const POST_MESSAGE: &str = "chat.postMessage";
}

/// A channel as described by the chat service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteChannel {
    pub id: String,

    /// Empty when the service omits it (e.g. channel info responses)
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub is_archived: bool,

    #[serde(default)]
    pub purpose: String,

    #[serde(default)]
    pub members: Vec<String>,
}

/// Result of creating a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedChannel {
    pub id: String,

    /// Initial membership (usually just the creating bot)
    #[serde(default)]
    pub members: Vec<String>,
}

/// A user from the chat service's directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    pub id: String,

    /// Contact address (email), when the profile exposes one
    pub contact_address: Option<String>,
}

/// A pre-formatted message to post into a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,

    /// Optional attachments payload, passed through verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<serde_json::Value>,

    /// Display name for the posting bot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Channel operations on the chat service
#[async_trait]
pub trait ChannelApi: Send + Sync {
    /// Enumerate every channel, archived ones included
    async fn list_channels(&self) -> RemoteResult<Vec<RemoteChannel>>;

    /// Fetch one channel by id
    async fn get_channel_info(&self, id: &str) -> RemoteResult<RemoteChannel>;

    /// Create a channel with the given name
    async fn create_channel(&self, name: &str) -> RemoteResult<CreatedChannel>;

    /// Unarchive a channel
    async fn unarchive_channel(&self, id: &str) -> RemoteResult<()>;

    /// Join a channel by name
    async fn join_channel(&self, name: &str) -> RemoteResult<()>;

    /// Set the channel purpose
    async fn set_channel_purpose(&self, id: &str, purpose: &str) -> RemoteResult<()>;

    /// Archive a channel
    async fn archive_channel(&self, id: &str) -> RemoteResult<()>;

    /// Invite a user; returns the channel's membership after the invite
    async fn invite_user(&self, channel_id: &str, user_id: &str) -> RemoteResult<Vec<String>>;
}

/// User directory on the chat service
#[async_trait]
pub trait UserDirectoryApi: Send + Sync {
    /// Enumerate all users in one bulk fetch
    async fn list_users(&self) -> RemoteResult<Vec<RemoteUser>>;
}

/// Message delivery on the chat service
#[async_trait]
pub trait MessageApi: Send + Sync {
    /// Post a message to a channel
    async fn post_message(&self, channel_id: &str, message: &OutgoingMessage) -> RemoteResult<()>;
}
