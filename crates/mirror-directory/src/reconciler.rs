//! Channel reconciliation engine
//!
//! Drives a project's channel toward `Active` with the desired purpose:
//!
//! ```text
//! NoChannel --create--> Active <--unarchive+join-- Archived
//!                         |  ^                         ^
//!                         |  +------ set_purpose       |
//!                         +-----------archive----------+
//! ```
//!
//! Lookups go through the [`ChannelDirectory`] first. A fresh entry is used
//! as-is, a stale entry is refreshed with a single channel-info call, and a
//! missing key triggers a full reload of the directory.

use crate::clock::Clock;
use crate::directory::ChannelDirectory;
use crate::error::DirectoryResult;
use crate::remote::ChannelApi;
use crate::types::{ChannelEntry, ProjectKey};
use chrono::Duration;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Reconciles cached channel state against the chat service
pub struct ChannelReconciler {
    api: Arc<dyn ChannelApi>,
    directory: Arc<ChannelDirectory>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    key_locks: DashMap<ProjectKey, Arc<Mutex<()>>>,
}

impl ChannelReconciler {
    /// Create a new reconciler
    pub fn new(
        api: Arc<dyn ChannelApi>,
        directory: Arc<ChannelDirectory>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            api,
            directory,
            clock,
            ttl,
            key_locks: DashMap::new(),
        }
    }

    pub fn directory(&self) -> &Arc<ChannelDirectory> {
        &self.directory
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Load the full directory from the chat service. Returns the number of
    /// cached channels.
    pub async fn warm(&self) -> DirectoryResult<usize> {
        self.reload().await
    }

    /// Ensure a non-archived channel with `purpose` exists for `project_key`.
    ///
    /// Remote steps run strictly in order (create or unarchive, join,
    /// set purpose). The first failing step aborts the call; whatever already
    /// succeeded stays recorded in the directory.
    pub async fn resolve_channel(
        &self,
        project_key: &str,
        purpose: &str,
    ) -> DirectoryResult<ChannelEntry> {
        let key = ProjectKey::parse(project_key)?;
        let lock = self.lock_for(&key);
        let result = {
            let _guard = lock.lock().await;
            self.resolve_locked(&key, purpose).await
        };
        self.release_lock(&key, lock);
        result
    }

    /// Archive the project's channel. No-op when it is unknown or already
    /// archived.
    pub async fn archive_channel(&self, project_key: &str) -> DirectoryResult<()> {
        let key = ProjectKey::parse(project_key)?;
        let lock = self.lock_for(&key);
        let result = {
            let _guard = lock.lock().await;
            self.archive_locked(&key).await
        };
        self.release_lock(&key, lock);
        result
    }

    fn lock_for(&self, key: &ProjectKey) -> Arc<Mutex<()>> {
        self.key_locks.entry(key.clone()).or_default().clone()
    }

    /// Drop the caller's handle and forget the lock once nobody else holds it.
    fn release_lock(&self, key: &ProjectKey, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.key_locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn resolve_locked(
        &self,
        key: &ProjectKey,
        purpose: &str,
    ) -> DirectoryResult<ChannelEntry> {
        let entry = match self.lookup(key).await? {
            Some(entry) => entry,
            None => self.create(key).await?,
        };

        let entry = if entry.archived {
            self.reactivate(entry).await?
        } else {
            entry
        };

        self.sync_purpose(entry, purpose).await
    }

    async fn archive_locked(&self, key: &ProjectKey) -> DirectoryResult<()> {
        match self.lookup(key).await? {
            Some(mut entry) if !entry.archived => {
                self.api.archive_channel(&entry.remote_id).await?;
                entry.archived = true;
                tracing::info!(project_key = %key, channel_id = %entry.remote_id, "Archived channel");
                self.directory.put(entry).await;
            }
            _ => {
                tracing::debug!(project_key = %key, "Channel is already archived or does not exist");
            }
        }

        Ok(())
    }

    /// Tri-state cache lookup: fresh hit, stale hit, or miss.
    async fn lookup(&self, key: &ProjectKey) -> DirectoryResult<Option<ChannelEntry>> {
        let now = self.clock.now();

        match self.directory.get(key).await {
            Some(entry) if entry.is_fresh(now) => {
                tracing::debug!(project_key = %key, "Channel cache hit");
                Ok(Some(entry))
            }
            Some(stale) => {
                tracing::debug!(project_key = %key, "Channel cache entry expired");
                self.refresh(stale).await.map(Some)
            }
            None => {
                tracing::debug!(project_key = %key, "Channel cache miss, reloading directory");
                self.reload().await?;
                Ok(self.directory.get(key).await)
            }
        }
    }

    async fn refresh(&self, stale: ChannelEntry) -> DirectoryResult<ChannelEntry> {
        let channel = self.api.get_channel_info(&stale.remote_id).await?;
        let entry = ChannelEntry::from_remote(stale.key, channel, self.clock.now() + self.ttl);
        self.directory.put(entry.clone()).await;
        Ok(entry)
    }

    async fn reload(&self) -> DirectoryResult<usize> {
        let channels = self.api.list_channels().await?;
        let expires_at = self.clock.now() + self.ttl;

        let entries: Vec<_> = channels
            .into_iter()
            .filter_map(|channel| {
                let key = ProjectKey::new(&channel.name);
                (!key.is_empty()).then(|| ChannelEntry::from_remote(key, channel, expires_at))
            })
            .collect();

        let count = entries.len();
        self.directory.bulk_replace(entries).await;
        tracing::debug!(channels = count, "Reloaded channel directory");
        Ok(count)
    }

    async fn create(&self, key: &ProjectKey) -> DirectoryResult<ChannelEntry> {
        let created = self.api.create_channel(key.as_str()).await?;

        let entry = ChannelEntry {
            key: key.clone(),
            remote_id: created.id,
            archived: false,
            purpose: String::new(),
            members: created.members.into_iter().collect(),
            expires_at: self.clock.now() + self.ttl,
        };

        tracing::info!(project_key = %key, channel_id = %entry.remote_id, "Created channel");
        self.directory.put(entry.clone()).await;
        Ok(entry)
    }

    async fn reactivate(&self, mut entry: ChannelEntry) -> DirectoryResult<ChannelEntry> {
        self.api.unarchive_channel(&entry.remote_id).await?;
        entry.archived = false;
        self.directory.put(entry.clone()).await;
        tracing::info!(project_key = %entry.key, channel_id = %entry.remote_id, "Unarchived channel");

        self.api.join_channel(entry.key.as_str()).await?;
        Ok(entry)
    }

    async fn sync_purpose(
        &self,
        mut entry: ChannelEntry,
        purpose: &str,
    ) -> DirectoryResult<ChannelEntry> {
        if entry.purpose == purpose {
            return Ok(entry);
        }

        self.api
            .set_channel_purpose(&entry.remote_id, purpose)
            .await?;
        entry.purpose = purpose.to_string();
        tracing::debug!(project_key = %entry.key, "Updated channel purpose");
        self.directory.put(entry.clone()).await;
        Ok(entry)
    }
}

impl std::fmt::Debug for ChannelReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelReconciler")
            .field("ttl", &self.ttl)
            .finish()
    }
}
