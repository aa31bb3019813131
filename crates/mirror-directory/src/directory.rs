//! Channel directory cache
//!
//! A keyed store of [`ChannelEntry`] values. It never calls the remote
//! service; the reconciler decides when entries are loaded or refreshed.

use crate::types::{ChannelEntry, ProjectKey};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

/// In-process view of channel state per project key
#[derive(Debug, Default)]
pub struct ChannelDirectory {
    entries: RwLock<HashMap<ProjectKey, ChannelEntry>>,
}

impl ChannelDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the entry for a project key
    pub async fn get(&self, key: &ProjectKey) -> Option<ChannelEntry> {
        let entries = self.entries.read().await;
        entries.get(key).cloned()
    }

    /// Store a complete entry under its own key, replacing any previous one
    pub async fn put(&self, entry: ChannelEntry) {
        let mut entries = self.entries.write().await;
        entries.insert(entry.key.clone(), entry);
    }

    /// Replace the whole directory
    pub async fn bulk_replace(&self, replacement: Vec<ChannelEntry>) {
        let fresh: HashMap<_, _> = replacement
            .into_iter()
            .map(|entry| (entry.key.clone(), entry))
            .collect();

        let mut entries = self.entries.write().await;
        *entries = fresh;
    }

    /// Overwrite the membership of an entry, provided it still refers to the
    /// same remote channel. Returns whether the entry was updated.
    pub async fn update_members(
        &self,
        key: &ProjectKey,
        remote_id: &str,
        members: BTreeSet<String>,
    ) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) if entry.remote_id == remote_id => {
                entry.members = members;
                true
            }
            _ => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// All entries, ordered by key
    pub async fn snapshot(&self) -> Vec<ChannelEntry> {
        let entries = self.entries.read().await;
        let mut all: Vec<_> = entries.values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(key: &str, remote_id: &str) -> ChannelEntry {
        ChannelEntry {
            key: ProjectKey::new(key),
            remote_id: remote_id.to_string(),
            archived: false,
            purpose: String::new(),
            members: BTreeSet::new(),
            expires_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn put_replaces_entry_for_same_key() {
        let directory = ChannelDirectory::new();
        directory.put(entry("abc", "C1")).await;
        directory.put(entry("ABC", "C2")).await;

        assert_eq!(directory.len().await, 1);
        let stored = directory.get(&ProjectKey::new("abc")).await.unwrap();
        assert_eq!(stored.remote_id, "C2");
    }

    #[tokio::test]
    async fn bulk_replace_drops_previous_entries() {
        let directory = ChannelDirectory::new();
        directory.put(entry("old", "C0")).await;

        directory
            .bulk_replace(vec![entry("web", "C1"), entry("api", "C2")])
            .await;

        assert!(directory.get(&ProjectKey::new("old")).await.is_none());
        let keys: Vec<_> = directory
            .snapshot()
            .await
            .into_iter()
            .map(|e| e.key.to_string())
            .collect();
        assert_eq!(keys, vec!["api", "web"]);
    }

    #[tokio::test]
    async fn update_members_ignores_replaced_channel() {
        let directory = ChannelDirectory::new();
        directory.put(entry("abc", "C1")).await;
        let key = ProjectKey::new("abc");

        let members: BTreeSet<String> = ["U1".to_string()].into();
        assert!(!directory.update_members(&key, "C9", members.clone()).await);
        assert!(directory.update_members(&key, "C1", members).await);
        assert!(directory.get(&key).await.unwrap().is_member("U1"));
    }

    #[tokio::test]
    async fn starts_empty() {
        let directory = ChannelDirectory::new();
        assert!(directory.is_empty().await);
        assert!(directory.get(&ProjectKey::new("abc")).await.is_none());
    }
}
