//! Invitation reconciliation
//!
//! Invites the users behind a set of contact addresses into a channel,
//! skipping addresses that are blank, unknown to the user directory, or that
//! belong to users already in the channel.

use crate::directory::ChannelDirectory;
use crate::error::DirectoryResult;
use crate::remote::ChannelApi;
use crate::types::ChannelEntry;
use crate::users::{normalize_address, UserDirectory};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Outcome of one invitation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteReport {
    /// User ids that were invited successfully
    pub invited: Vec<String>,

    /// Addresses with no chat user, or whose user is already a member
    pub skipped: Vec<String>,

    /// Per-user invite failures
    pub failed: Vec<InviteFailure>,
}

/// A single failed invite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteFailure {
    pub user_id: String,
    pub error: String,
}

/// Invites missing members into channels
pub struct InvitationReconciler {
    api: Arc<dyn ChannelApi>,
    users: Arc<UserDirectory>,
    directory: Arc<ChannelDirectory>,
}

impl InvitationReconciler {
    pub fn new(
        api: Arc<dyn ChannelApi>,
        users: Arc<UserDirectory>,
        directory: Arc<ChannelDirectory>,
    ) -> Self {
        Self {
            api,
            users,
            directory,
        }
    }

    pub fn users(&self) -> &Arc<UserDirectory> {
        &self.users
    }

    /// Invite every address's user that is not yet in `entry`.
    ///
    /// Invites are issued concurrently and fail independently. Each success
    /// replaces `entry.members` with the membership the service reported.
    /// Only a failure to load the user directory is returned as an error.
    pub async fn invite_users(
        &self,
        entry: &mut ChannelEntry,
        addresses: &[Option<String>],
    ) -> DirectoryResult<InviteReport> {
        self.users.load_if_expired().await?;

        let mut report = InviteReport::default();
        let mut pending = BTreeSet::new();

        for address in addresses.iter().flatten() {
            let Some(address) = normalize_address(address) else {
                continue;
            };

            match self.users.resolve(&address).await {
                Some(user_id) if !entry.is_member(&user_id) => {
                    pending.insert(user_id);
                }
                Some(_) => report.skipped.push(address),
                None => {
                    tracing::debug!(address = %address, "No chat user for address");
                    report.skipped.push(address);
                }
            }
        }

        if pending.is_empty() {
            return Ok(report);
        }

        let channel_id = entry.remote_id.as_str();
        let api = &self.api;
        let mut invites: FuturesUnordered<_> = pending
            .into_iter()
            .map(move |user_id| async move {
                let result = api.invite_user(channel_id, &user_id).await;
                (user_id, result)
            })
            .collect();

        let mut latest_members = None;
        while let Some((user_id, result)) = invites.next().await {
            match result {
                Ok(members) => {
                    latest_members = Some(members);
                    report.invited.push(user_id);
                }
                Err(e) => {
                    tracing::warn!(
                        channel_id = %channel_id,
                        user_id = %user_id,
                        error = %e,
                        "Failed to invite user"
                    );
                    report.failed.push(InviteFailure {
                        user_id,
                        error: e.to_string(),
                    });
                }
            }
        }
        drop(invites);

        if let Some(members) = latest_members {
            entry.members = members.into_iter().collect();
            self.directory
                .update_members(&entry.key, &entry.remote_id, entry.members.clone())
                .await;
        }

        tracing::debug!(
            project_key = %entry.key,
            invited = report.invited.len(),
            failed = report.failed.len(),
            "Invitation pass complete"
        );

        Ok(report)
    }
}

impl std::fmt::Debug for InvitationReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvitationReconciler")
            .field("users", &self.users)
            .finish()
    }
}
