//! Channel directory types

use crate::error::{DirectoryError, DirectoryResult};
use crate::remote::RemoteChannel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Tracker project key, normalized to lowercase.
///
/// The normalized key doubles as the chat channel name and the cache key, so
/// `"ABC"` and `"abc"` always address the same channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ProjectKey(String);

impl ProjectKey {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    /// Normalize and reject keys that are empty after trimming.
    pub fn parse(raw: &str) -> DirectoryResult<Self> {
        let key = Self::new(raw);
        if key.0.is_empty() {
            return Err(DirectoryError::InvalidProjectKey(raw.to_string()));
        }
        Ok(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ProjectKey {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for ProjectKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<ProjectKey> for String {
    fn from(key: ProjectKey) -> Self {
        key.0
    }
}

/// Cached knowledge of one chat channel bound to a project key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntry {
    /// Project key (also the channel name)
    pub key: ProjectKey,

    /// Chat-service channel identifier
    pub remote_id: String,

    /// Whether the channel was archived when last observed
    pub archived: bool,

    /// Last known or last set purpose text
    pub purpose: String,

    /// Chat-service user ids known to be in the channel
    pub members: BTreeSet<String>,

    /// After this instant the entry is stale and must be revalidated
    pub expires_at: DateTime<Utc>,
}

impl ChannelEntry {
    /// Build an entry from a remote channel description.
    pub fn from_remote(key: ProjectKey, channel: RemoteChannel, expires_at: DateTime<Utc>) -> Self {
        Self {
            key,
            remote_id: channel.id,
            archived: channel.is_archived,
            purpose: channel.purpose,
            members: channel.members.into_iter().collect(),
            expires_at,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.contains(user_id)
    }

    pub fn state(&self) -> ChannelState {
        if self.archived {
            ChannelState::Archived
        } else {
            ChannelState::Active
        }
    }
}

/// Lifecycle state of a project's channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    NoChannel,
    Archived,
    Active,
}

impl ChannelState {
    pub fn of(entry: Option<&ChannelEntry>) -> Self {
        entry.map_or(ChannelState::NoChannel, ChannelEntry::state)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::NoChannel => f.write_str("no_channel"),
            ChannelState::Archived => f.write_str("archived"),
            ChannelState::Active => f.write_str("active"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn project_key_is_lowercased_and_trimmed() {
        assert_eq!(ProjectKey::new("  ABC ").as_str(), "abc");
        assert_eq!(ProjectKey::from("Test_Channel"), ProjectKey::new("test_channel"));
    }

    #[test]
    fn blank_project_key_is_rejected() {
        assert!(matches!(
            ProjectKey::parse("   "),
            Err(DirectoryError::InvalidProjectKey(_))
        ));
        assert!(ProjectKey::parse("Web").is_ok());
    }

    #[test]
    fn project_key_deserializes_normalized() {
        let key: ProjectKey = serde_json::from_str("\"OPS\"").unwrap();
        assert_eq!(key.as_str(), "ops");
    }

    #[test]
    fn freshness_is_strict_before_expiry() {
        let now = Utc::now();
        let entry = ChannelEntry {
            key: ProjectKey::new("abc"),
            remote_id: "C1".into(),
            archived: false,
            purpose: String::new(),
            members: BTreeSet::new(),
            expires_at: now,
        };
        assert!(!entry.is_fresh(now));
        assert!(entry.is_fresh(now - Duration::seconds(1)));
    }

    #[test]
    fn state_follows_archived_flag() {
        assert_eq!(ChannelState::of(None), ChannelState::NoChannel);

        let mut entry = ChannelEntry::from_remote(
            ProjectKey::new("abc"),
            RemoteChannel {
                id: "C1".into(),
                name: "abc".into(),
                is_archived: true,
                purpose: "old".into(),
                members: vec!["U1".into()],
            },
            Utc::now(),
        );
        assert_eq!(entry.state(), ChannelState::Archived);
        assert!(entry.is_member("U1"));

        entry.archived = false;
        assert_eq!(ChannelState::of(Some(&entry)), ChannelState::Active);
    }
}
