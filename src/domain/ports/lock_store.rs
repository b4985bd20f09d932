//! Lock store port - shared key/value store with expiry.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::LockStoreError;

/// Atomic set-if-absent store backing the convergence gate.
///
/// `set_if_absent` must be atomic with respect to concurrent callers for the
/// same key: at most one of them observes `true` while the entry is live.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Store `value` under `key` with the given expiry unless a live entry
    /// exists. Returns `true` when the entry was created.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, LockStoreError>;

    /// Remove the entry if it is live and holds `owner`. Returns `true` when
    /// an entry was removed; a missing, expired or foreign entry is left
    /// alone and is not an error.
    async fn delete_if_owner(&self, key: &str, owner: &str) -> Result<bool, LockStoreError>;
}
