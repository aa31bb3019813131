//! HTTP client for the chat Web API

use crate::config::SlackConfig;
use crate::error::{ChatError, ChatResult};
use crate::wire::{self, WireChannel, WireUser};
use async_trait::async_trait;
use mirror_directory::remote::methods;
use mirror_directory::{
    ChannelApi, CreatedChannel, MessageApi, OutgoingMessage, RemoteChannel, RemoteResult,
    RemoteUser, UserDirectoryApi,
};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, trace};

type Params<'a> = Vec<(&'a str, String)>;

/// Web API client backing the channel directory
pub struct SlackClient {
    client: Client,
    base_url: String,
    token: String,
    bot_username: String,
    page_size: u32,
}

impl SlackClient {
    /// Create a new client from configuration
    pub fn new(config: &SlackConfig) -> ChatResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            bot_username: config.bot_username.clone(),
            page_size: config.page_size.max(1),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ========== Internal HTTP helpers ==========

    async fn call(&self, method: &str, params: &Params<'_>) -> ChatResult<Value> {
        let url = format!("{}/{}", self.base_url, method);
        trace!(method, "Calling chat API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .form(params)
            .send()
            .await?;

        debug!(method, status = response.status().as_u16(), "Chat API responded");
        self.handle_response(response).await
    }

    async fn handle_response(&self, response: reqwest::Response) -> ChatResult<Value> {
        let status = response.status();

        if status.is_success() {
            wire::check_envelope(response.json().await?)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(ChatError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Follow `response_metadata.next_cursor` until exhausted, collecting
    /// `field` from every page. A cursor that comes back twice is an error.
    async fn call_paginated<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        field: &str,
        base: Params<'_>,
    ) -> ChatResult<Vec<T>> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let mut params = base.clone();
            params.push(("limit", self.page_size.to_string()));
            if let Some(cursor) = cursor.take() {
                params.push(("cursor", cursor));
            }

            let mut body = self.call(method, &params).await?;
            let page: Vec<T> = wire::field(&mut body, field)?;
            items.extend(page);

            match wire::next_cursor(&body) {
                Some(next) if !seen.insert(next.clone()) => {
                    return Err(ChatError::Decode(format!(
                        "{} returned repeated cursor `{}`",
                        method, next
                    )));
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(method, count = items.len(), "Fetched paginated listing");
        Ok(items)
    }

    async fn call_for_channel(&self, method: &str, params: &Params<'_>) -> ChatResult<WireChannel> {
        let mut body = self.call(method, params).await?;
        wire::field(&mut body, "channel")
    }
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("base_url", &self.base_url)
            .field("bot_username", &self.bot_username)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ChannelApi for SlackClient {
    async fn list_channels(&self) -> RemoteResult<Vec<RemoteChannel>> {
        let params = vec![("exclude_archived", "false".to_string())];
        let channels: Vec<WireChannel> = self
            .call_paginated(methods::LIST_CHANNELS, "channels", params)
            .await
            .map_err(|e| e.into_remote(methods::LIST_CHANNELS))?;

        Ok(channels.into_iter().map(RemoteChannel::from).collect())
    }

    async fn get_channel_info(&self, id: &str) -> RemoteResult<RemoteChannel> {
        let params = vec![("channel", id.to_string())];
        self.call_for_channel(methods::CHANNEL_INFO, &params)
            .await
            .map(RemoteChannel::from)
            .map_err(|e| e.into_remote(methods::CHANNEL_INFO))
    }

    async fn create_channel(&self, name: &str) -> RemoteResult<CreatedChannel> {
        let params = vec![("name", name.to_string())];
        let channel = self
            .call_for_channel(methods::CREATE_CHANNEL, &params)
            .await
            .map_err(|e| e.into_remote(methods::CREATE_CHANNEL))?;

        Ok(CreatedChannel {
            id: channel.id,
            members: channel.members,
        })
    }

    async fn unarchive_channel(&self, id: &str) -> RemoteResult<()> {
        let params = vec![("channel", id.to_string())];
        self.call(methods::UNARCHIVE_CHANNEL, &params)
            .await
            .map(|_| ())
            .map_err(|e| e.into_remote(methods::UNARCHIVE_CHANNEL))
    }

    async fn join_channel(&self, name: &str) -> RemoteResult<()> {
        let params = vec![("name", name.to_string())];
        self.call(methods::JOIN_CHANNEL, &params)
            .await
            .map(|_| ())
            .map_err(|e| e.into_remote(methods::JOIN_CHANNEL))
    }

    async fn set_channel_purpose(&self, id: &str, purpose: &str) -> RemoteResult<()> {
        let params = vec![("channel", id.to_string()), ("purpose", purpose.to_string())];
        self.call(methods::SET_PURPOSE, &params)
            .await
            .map(|_| ())
            .map_err(|e| e.into_remote(methods::SET_PURPOSE))
    }

    async fn archive_channel(&self, id: &str) -> RemoteResult<()> {
        let params = vec![("channel", id.to_string())];
        self.call(methods::ARCHIVE_CHANNEL, &params)
            .await
            .map(|_| ())
            .map_err(|e| e.into_remote(methods::ARCHIVE_CHANNEL))
    }

    async fn invite_user(&self, channel_id: &str, user_id: &str) -> RemoteResult<Vec<String>> {
        let params = vec![
            ("channel", channel_id.to_string()),
            ("user", user_id.to_string()),
        ];
        self.call_for_channel(methods::INVITE_USER, &params)
            .await
            .map(|channel| channel.members)
            .map_err(|e| e.into_remote(methods::INVITE_USER))
    }
}

#[async_trait]
impl UserDirectoryApi for SlackClient {
    async fn list_users(&self) -> RemoteResult<Vec<RemoteUser>> {
        let users: Vec<WireUser> = self
            .call_paginated(methods::LIST_USERS, "members", Vec::new())
            .await
            .map_err(|e| e.into_remote(methods::LIST_USERS))?;

        Ok(users.into_iter().filter_map(WireUser::into_remote).collect())
    }
}

#[async_trait]
impl MessageApi for SlackClient {
    async fn post_message(&self, channel_id: &str, message: &OutgoingMessage) -> RemoteResult<()> {
        let username = message
            .username
            .clone()
            .unwrap_or_else(|| self.bot_username.clone());

        let mut params = vec![
            ("channel", channel_id.to_string()),
            ("text", message.text.clone()),
            ("username", username),
            ("as_user", "false".to_string()),
        ];
        if let Some(attachments) = &message.attachments {
            params.push(("attachments", attachments.to_string()));
        }

        self.call(methods::POST_MESSAGE, &params)
            .await
            .map(|_| ())
            .map_err(|e| e.into_remote(methods::POST_MESSAGE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = SlackConfig {
            base_url: "http://localhost:9000/api/".into(),
            ..SlackConfig::default()
        };
        let client = SlackClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000/api");
    }

    #[test]
    fn debug_output_hides_token() {
        let config = SlackConfig {
            token: "xoxb-secret".into(),
            ..SlackConfig::default()
        };
        let client = SlackClient::new(&config).unwrap();
        assert!(!format!("{:?}", client).contains("xoxb-secret"));
    }
}
