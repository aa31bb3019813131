//! User directory cache
//!
//! Maps contact addresses to chat user ids. The remote directory is fetched in
//! bulk, so the whole table shares a single expiry.

use crate::clock::Clock;
use crate::error::DirectoryResult;
use crate::remote::UserDirectoryApi;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Normalize a contact address for lookup. Blank addresses yield `None`.
pub fn normalize_address(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

#[derive(Debug)]
struct UserTable {
    by_address: HashMap<String, String>,
    expires_at: DateTime<Utc>,
}

/// TTL-bounded mapping from contact address to chat user id
pub struct UserDirectory {
    api: Arc<dyn UserDirectoryApi>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    table: RwLock<UserTable>,
    // Serializes bulk loads so concurrent callers share one fetch
    load_lock: Mutex<()>,
}

impl UserDirectory {
    pub fn new(api: Arc<dyn UserDirectoryApi>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            api,
            clock,
            ttl,
            table: RwLock::new(UserTable {
                by_address: HashMap::new(),
                expires_at: DateTime::<Utc>::MIN_UTC,
            }),
            load_lock: Mutex::new(()),
        }
    }

    async fn is_expired(&self) -> bool {
        self.clock.now() >= self.table.read().await.expires_at
    }

    /// Reload the whole table if it has expired. Returns whether a fetch
    /// happened.
    pub async fn load_if_expired(&self) -> DirectoryResult<bool> {
        if !self.is_expired().await {
            return Ok(false);
        }

        let _guard = self.load_lock.lock().await;
        if !self.is_expired().await {
            return Ok(false);
        }

        let users = self.api.list_users().await?;
        let by_address: HashMap<_, _> = users
            .into_iter()
            .filter_map(|user| {
                let address = user.contact_address.as_deref().and_then(normalize_address)?;
                Some((address, user.id))
            })
            .collect();

        tracing::debug!(users = by_address.len(), "Loaded user directory");

        let mut table = self.table.write().await;
        table.by_address = by_address;
        table.expires_at = self.clock.now() + self.ttl;
        Ok(true)
    }

    /// Look up the chat user id for an address in the current table
    pub async fn resolve(&self, address: &str) -> Option<String> {
        let address = normalize_address(address)?;
        self.table.read().await.by_address.get(&address).cloned()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.by_address.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.by_address.is_empty()
    }

    pub async fn expires_at(&self) -> DateTime<Utc> {
        self.table.read().await.expires_at
    }
}

impl std::fmt::Debug for UserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDirectory")
            .field("ttl", &self.ttl)
            .finish()
    }
}
