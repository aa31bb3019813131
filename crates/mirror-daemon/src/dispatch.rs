//! Webhook event dispatch
//!
//! Translates tracker events into channel directory operations:
//!
//! | event             | action                                          |
//! |-------------------|-------------------------------------------------|
//! | `project_created` | resolve channel, invite listed users            |
//! | `project_updated` | resolve channel, invite listed users            |
//! | `project_deleted` | archive channel                                 |
//! | `message`         | resolve channel, invite listed users, post text |

use crate::error::{ApiError, ApiResult};
use mirror_directory::{
    ChannelApi, ChannelDirectory, ChannelReconciler, Clock, InvitationReconciler, InviteReport,
    MessageApi, OutgoingMessage, UserDirectory, UserDirectoryApi,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Tracker-neutral webhook envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event name, e.g. `project_created`
    #[serde(default)]
    pub event: Option<String>,

    #[serde(default)]
    pub project: Option<ProjectRef>,

    /// Pre-formatted message for `message` events
    #[serde(default)]
    pub message: Option<MessageBody>,

    /// Contact addresses of users who should be in the channel
    #[serde(default)]
    pub invite: Option<Vec<Option<String>>>,
}

/// Project the event refers to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRef {
    pub key: String,

    /// Display name, used as the channel purpose. Required by every event
    /// except `project_deleted`.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    pub text: String,

    #[serde(default)]
    pub attachments: Option<serde_json::Value>,
}

/// Events the daemon acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ProjectCreated,
    ProjectUpdated,
    ProjectDeleted,
    Message,
}

impl EventKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "project_created" => Some(EventKind::ProjectCreated),
            "project_updated" => Some(EventKind::ProjectUpdated),
            "project_deleted" => Some(EventKind::ProjectDeleted),
            "message" => Some(EventKind::Message),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ProjectCreated => "project_created",
            EventKind::ProjectUpdated => "project_updated",
            EventKind::ProjectDeleted => "project_deleted",
            EventKind::Message => "message",
        }
    }
}

/// Result of a handled event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub event: String,
    pub project_key: String,

    /// Channel the event was applied to; absent for archives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub invites: Option<InviteReport>,
}

/// Routes webhook events to the reconcilers
pub struct Dispatcher {
    channels: Arc<ChannelReconciler>,
    invitations: Arc<InvitationReconciler>,
    messages: Arc<dyn MessageApi>,
    bot_username: String,
}

impl Dispatcher {
    /// Wire reconcilers over one chat backend. Both caches share `ttl`.
    pub fn new<A>(
        api: Arc<A>,
        clock: Arc<dyn Clock>,
        ttl: chrono::Duration,
        bot_username: impl Into<String>,
    ) -> Self
    where
        A: ChannelApi + UserDirectoryApi + MessageApi + 'static,
    {
        let directory = Arc::new(ChannelDirectory::new());
        let channels = Arc::new(ChannelReconciler::new(
            api.clone(),
            directory.clone(),
            clock.clone(),
            ttl,
        ));
        let users = Arc::new(UserDirectory::new(api.clone(), clock, ttl));
        let invitations = Arc::new(InvitationReconciler::new(api.clone(), users, directory));

        Self {
            channels,
            invitations,
            messages: api,
            bot_username: bot_username.into(),
        }
    }

    pub fn channels(&self) -> &Arc<ChannelReconciler> {
        &self.channels
    }

    pub fn directory(&self) -> &Arc<ChannelDirectory> {
        self.channels.directory()
    }

    /// Handle one event, logging failures.
    pub async fn handle(&self, event: WebhookEvent) -> ApiResult<DispatchOutcome> {
        let name = event.event.clone().unwrap_or_default();
        let kind = EventKind::parse(&name).ok_or_else(|| ApiError::UnsupportedEvent(name))?;

        let project = event
            .project
            .clone()
            .ok_or_else(|| ApiError::BadRequest("Missing project".to_string()))?;

        let result = self.apply(kind, &project, event).await;
        match &result {
            Ok(outcome) => info!(
                event = kind.as_str(),
                project_key = %project.key,
                channel_id = ?outcome.channel_id,
                "Event handled"
            ),
            Err(e) => error!(
                event = kind.as_str(),
                project_key = %project.key,
                error = %e,
                "Event failed"
            ),
        }
        result
    }

    async fn apply(
        &self,
        kind: EventKind,
        project: &ProjectRef,
        event: WebhookEvent,
    ) -> ApiResult<DispatchOutcome> {
        let mut outcome = DispatchOutcome {
            event: kind.as_str().to_string(),
            project_key: project.key.clone(),
            channel_id: None,
            invites: None,
        };

        if kind == EventKind::ProjectDeleted {
            self.channels.archive_channel(&project.key).await?;
            return Ok(outcome);
        }

        let purpose = project
            .name
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest("Missing project name".to_string()))?;

        let message = match kind {
            EventKind::Message => Some(event.message.ok_or_else(|| {
                ApiError::BadRequest("Message event without message".to_string())
            })?),
            _ => None,
        };

        let mut entry = self
            .channels
            .resolve_channel(&project.key, purpose)
            .await?;

        // Invitations are best-effort
        if let Some(addresses) = event.invite {
            match self.invitations.invite_users(&mut entry, &addresses).await {
                Ok(report) => outcome.invites = Some(report),
                Err(e) => warn!(
                    project_key = %project.key,
                    error = %e,
                    "Skipping invitations"
                ),
            }
        }

        if let Some(message) = message {
            let outgoing = OutgoingMessage {
                text: message.text,
                attachments: message.attachments,
                username: Some(self.bot_username.clone()),
            };
            self.messages
                .post_message(&entry.remote_id, &outgoing)
                .await
                .map_err(|e| ApiError::Reconciliation(e.into()))?;
        }

        outcome.channel_id = Some(entry.remote_id);
        Ok(outcome)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("channels", &self.channels)
            .field("bot_username", &self.bot_username)
            .finish_non_exhaustive()
    }
}
