//! In-memory chat backend
//!
//! Implements every remote trait against local state, records each call in
//! order, and can be told to fail specific methods. Suitable for development
//! and testing; production deployments use an HTTP transport.

use crate::error::{RemoteError, RemoteResult};
use crate::remote::{
    methods, ChannelApi, CreatedChannel, MessageApi, OutgoingMessage, RemoteChannel, RemoteUser,
    UserDirectoryApi,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// User id the in-memory backend acts as
pub const DEFAULT_SELF_USER: &str = "UBOT";

/// A recorded remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCall {
    ListChannels,
    GetChannelInfo(String),
    CreateChannel(String),
    UnarchiveChannel(String),
    JoinChannel(String),
    SetChannelPurpose { id: String, purpose: String },
    ArchiveChannel(String),
    InviteUser { channel_id: String, user_id: String },
    ListUsers,
    PostMessage { channel_id: String, text: String },
}

impl ChatCall {
    /// Web API method name of this call
    pub fn method(&self) -> &'static str {
        match self {
            ChatCall::ListChannels => methods::LIST_CHANNELS,
            ChatCall::GetChannelInfo(_) => methods::CHANNEL_INFO,
            ChatCall::CreateChannel(_) => methods::CREATE_CHANNEL,
            ChatCall::UnarchiveChannel(_) => methods::UNARCHIVE_CHANNEL,
            ChatCall::JoinChannel(_) => methods::JOIN_CHANNEL,
            ChatCall::SetChannelPurpose { .. } => methods::SET_PURPOSE,
            ChatCall::ArchiveChannel(_) => methods::ARCHIVE_CHANNEL,
            ChatCall::InviteUser { .. } => methods::INVITE_USER,
            ChatCall::ListUsers => methods::LIST_USERS,
            ChatCall::PostMessage { .. } => methods::POST_MESSAGE,
        }
    }
}

/// In-memory chat service
#[derive(Debug)]
pub struct InMemoryChatApi {
    self_user: String,
    channels: RwLock<HashMap<String, RemoteChannel>>,
    users: RwLock<Vec<RemoteUser>>,
    messages: RwLock<Vec<(String, OutgoingMessage)>>,
    calls: RwLock<Vec<ChatCall>>,
    failures: RwLock<HashMap<String, String>>,
    next_id: AtomicU64,
}

impl Default for InMemoryChatApi {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChatApi {
    /// Create an empty backend acting as [`DEFAULT_SELF_USER`]
    pub fn new() -> Self {
        Self::with_self_user(DEFAULT_SELF_USER)
    }

    pub fn with_self_user(self_user: impl Into<String>) -> Self {
        Self {
            self_user: self_user.into(),
            channels: RwLock::new(HashMap::new()),
            users: RwLock::new(Vec::new()),
            messages: RwLock::new(Vec::new()),
            calls: RwLock::new(Vec::new()),
            failures: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn generate_id(&self) -> String {
        format!("C{:08}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Seed a channel without recording a call. Returns its id.
    pub async fn add_channel(
        &self,
        name: &str,
        archived: bool,
        purpose: &str,
        members: &[&str],
    ) -> String {
        let id = self.generate_id();
        let channel = RemoteChannel {
            id: id.clone(),
            name: name.to_string(),
            is_archived: archived,
            purpose: purpose.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
        };
        self.channels.write().await.insert(id.clone(), channel);
        id
    }

    /// Seed a directory user
    pub async fn add_user(&self, id: &str, contact_address: Option<&str>) {
        self.users.write().await.push(RemoteUser {
            id: id.to_string(),
            contact_address: contact_address.map(str::to_string),
        });
    }

    /// Make every subsequent call to `method` fail with `error`
    pub async fn fail(&self, method: &str, error: &str) {
        self.failures
            .write()
            .await
            .insert(method.to_string(), error.to_string());
    }

    pub async fn clear_failure(&self, method: &str) {
        self.failures.write().await.remove(method);
    }

    /// Recorded calls, oldest first
    pub async fn calls(&self) -> Vec<ChatCall> {
        self.calls.read().await.clone()
    }

    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }

    /// Number of recorded calls to `method`
    pub async fn count(&self, method: &str) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| call.method() == method)
            .count()
    }

    pub async fn channel(&self, id: &str) -> Option<RemoteChannel> {
        self.channels.read().await.get(id).cloned()
    }

    pub async fn channel_by_name(&self, name: &str) -> Option<RemoteChannel> {
        self.channels
            .read()
            .await
            .values()
            .find(|c| c.name == name)
            .cloned()
    }

    /// Messages posted so far, as `(channel_id, message)`
    pub async fn messages(&self) -> Vec<(String, OutgoingMessage)> {
        self.messages.read().await.clone()
    }

    /// Record the call and apply any injected failure
    async fn begin(&self, call: ChatCall) -> RemoteResult<()> {
        let method = call.method();
        self.calls.write().await.push(call);

        match self.failures.read().await.get(method) {
            Some(error) => Err(RemoteError::new(method, error.clone())),
            None => Ok(()),
        }
    }
}

fn channel_not_found(method: &str) -> RemoteError {
    RemoteError::new(method, "channel_not_found")
}

#[async_trait]
impl ChannelApi for InMemoryChatApi {
    async fn list_channels(&self) -> RemoteResult<Vec<RemoteChannel>> {
        self.begin(ChatCall::ListChannels).await?;

        let mut channels: Vec<_> = self.channels.read().await.values().cloned().collect();
        channels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(channels)
    }

    async fn get_channel_info(&self, id: &str) -> RemoteResult<RemoteChannel> {
        self.begin(ChatCall::GetChannelInfo(id.to_string())).await?;

        self.channel(id)
            .await
            .ok_or_else(|| channel_not_found(methods::CHANNEL_INFO))
    }

    async fn create_channel(&self, name: &str) -> RemoteResult<CreatedChannel> {
        self.begin(ChatCall::CreateChannel(name.to_string())).await?;

        if name.is_empty() {
            return Err(RemoteError::new(methods::CREATE_CHANNEL, "invalid_name_required"));
        }
        if self.channel_by_name(name).await.is_some() {
            return Err(RemoteError::new(methods::CREATE_CHANNEL, "name_taken"));
        }

        let id = self.generate_id();
        let members = vec![self.self_user.clone()];
        self.channels.write().await.insert(
            id.clone(),
            RemoteChannel {
                id: id.clone(),
                name: name.to_string(),
                is_archived: false,
                purpose: String::new(),
                members: members.clone(),
            },
        );

        Ok(CreatedChannel { id, members })
    }

    async fn unarchive_channel(&self, id: &str) -> RemoteResult<()> {
        self.begin(ChatCall::UnarchiveChannel(id.to_string())).await?;

        let mut channels = self.channels.write().await;
        let channel = channels
            .get_mut(id)
            .ok_or_else(|| channel_not_found(methods::UNARCHIVE_CHANNEL))?;
        if !channel.is_archived {
            return Err(RemoteError::new(methods::UNARCHIVE_CHANNEL, "not_archived"));
        }
        channel.is_archived = false;
        Ok(())
    }

    async fn join_channel(&self, name: &str) -> RemoteResult<()> {
        self.begin(ChatCall::JoinChannel(name.to_string())).await?;

        let mut channels = self.channels.write().await;
        let channel = channels
            .values_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| channel_not_found(methods::JOIN_CHANNEL))?;
        if channel.is_archived {
            return Err(RemoteError::new(methods::JOIN_CHANNEL, "is_archived"));
        }
        if !channel.members.contains(&self.self_user) {
            channel.members.push(self.self_user.clone());
        }
        Ok(())
    }

    async fn set_channel_purpose(&self, id: &str, purpose: &str) -> RemoteResult<()> {
        self.begin(ChatCall::SetChannelPurpose {
            id: id.to_string(),
            purpose: purpose.to_string(),
        })
        .await?;

        let mut channels = self.channels.write().await;
        let channel = channels
            .get_mut(id)
            .ok_or_else(|| channel_not_found(methods::SET_PURPOSE))?;
        channel.purpose = purpose.to_string();
        Ok(())
    }

    async fn archive_channel(&self, id: &str) -> RemoteResult<()> {
        self.begin(ChatCall::ArchiveChannel(id.to_string())).await?;

        let mut channels = self.channels.write().await;
        let channel = channels
            .get_mut(id)
            .ok_or_else(|| channel_not_found(methods::ARCHIVE_CHANNEL))?;
        if channel.is_archived {
            return Err(RemoteError::new(methods::ARCHIVE_CHANNEL, "already_archived"));
        }
        channel.is_archived = true;
        Ok(())
    }

    async fn invite_user(&self, channel_id: &str, user_id: &str) -> RemoteResult<Vec<String>> {
        self.begin(ChatCall::InviteUser {
            channel_id: channel_id.to_string(),
            user_id: user_id.to_string(),
        })
        .await?;

        let known = self.users.read().await.iter().any(|u| u.id == user_id);
        if !known {
            return Err(RemoteError::new(methods::INVITE_USER, "user_not_found"));
        }

        let mut channels = self.channels.write().await;
        let channel = channels
            .get_mut(channel_id)
            .ok_or_else(|| channel_not_found(methods::INVITE_USER))?;
        if channel.members.iter().any(|m| m == user_id) {
            return Err(RemoteError::new(methods::INVITE_USER, "already_in_channel"));
        }
        channel.members.push(user_id.to_string());
        Ok(channel.members.clone())
    }
}

#[async_trait]
impl UserDirectoryApi for InMemoryChatApi {
    async fn list_users(&self) -> RemoteResult<Vec<RemoteUser>> {
        self.begin(ChatCall::ListUsers).await?;
        Ok(self.users.read().await.clone())
    }
}

#[async_trait]
impl MessageApi for InMemoryChatApi {
    async fn post_message(&self, channel_id: &str, message: &OutgoingMessage) -> RemoteResult<()> {
        self.begin(ChatCall::PostMessage {
            channel_id: channel_id.to_string(),
            text: message.text.clone(),
        })
        .await?;

        match self.channel(channel_id).await {
            Some(channel) if channel.is_archived => {
                Err(RemoteError::new(methods::POST_MESSAGE, "is_archived"))
            }
            Some(_) => {
                self.messages
                    .write()
                    .await
                    .push((channel_id.to_string(), message.clone()));
                Ok(())
            }
            None => Err(channel_not_found(methods::POST_MESSAGE)),
        }
    }
}
