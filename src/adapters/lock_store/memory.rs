//! In-process lock store for single-instance deployments and tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::errors::LockStoreError;
use crate::domain::ports::LockStore;

#[derive(Debug)]
struct Entry {
    owner: String,
    expires_at: Instant,
}

/// Lock store backed by a mutex-guarded map.
///
/// Expired entries are treated as absent. They are purged every
/// `PURGE_INTERVAL` insertions, so distinct keys cannot grow the map without
/// bound. Uses the tokio clock so that paused-time tests can advance past a
/// TTL.
#[derive(Debug, Default)]
pub struct MemoryLockStore {
    entries: Mutex<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, Entry>,
    inserts_since_purge: usize,
}

const PURGE_INTERVAL: usize = 64;

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn live_entries(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .map
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    /// Owner marker of the live entry under `key`.
    pub async fn owner(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .map
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.owner.clone())
    }

    /// Entries held in the map, expired ones included.
    pub async fn stored_entries(&self) -> usize {
        self.entries.lock().await.map.len()
    }

    pub async fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .map
            .get(key)
            .is_some_and(|e| e.expires_at > now)
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, LockStoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if entries.map.get(key).is_some_and(|e| e.expires_at > now) {
            return Ok(false);
        }
        entries.inserts_since_purge += 1;
        if entries.inserts_since_purge >= PURGE_INTERVAL {
            entries.map.retain(|_, e| e.expires_at > now);
            entries.inserts_since_purge = 0;
        }
        entries.map.insert(
            key.to_string(),
            Entry {
                owner: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn delete_if_owner(&self, key: &str, owner: &str) -> Result<bool, LockStoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let held = entries
            .map
            .get(key)
            .is_some_and(|e| e.expires_at > now && e.owner == owner);
        if held {
            entries.map.remove(key);
        }
        Ok(held)
    }
}
