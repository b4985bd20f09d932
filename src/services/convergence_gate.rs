//! Alert-storm convergence: one diagnosis per condition per window.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::models::config::ConvergenceConfig;
use crate::domain::ports::LockStore;

/// Owner marker stored when no explicit owner is given.
pub const DEFAULT_OWNER: &str = "PROCESSING";

/// Atomic per-key admission backed by a shared [`LockStore`].
///
/// `false` from [`try_admit`](Self::try_admit) is a normal skip. Store errors
/// fail open: the caller is admitted and a warning is logged.
#[derive(Clone)]
pub struct ConvergenceGate {
    store: Arc<dyn LockStore>,
    key_prefix: String,
    ttl: Duration,
}

impl ConvergenceGate {
    pub fn new(store: Arc<dyn LockStore>, config: &ConvergenceConfig) -> Self {
        Self {
            store,
            key_prefix: config.key_prefix.clone(),
            ttl: config.ttl(),
        }
    }

    /// Configured convergence window.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn store_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Admit `key` for `ttl` unless a live entry exists.
    pub async fn try_admit(&self, key: &str, ttl: Duration) -> bool {
        self.try_admit_as(key, DEFAULT_OWNER, ttl).await
    }

    /// Same as [`try_admit`](Self::try_admit), recording `owner` in the entry.
    pub async fn try_admit_as(&self, key: &str, owner: &str, ttl: Duration) -> bool {
        let store_key = self.store_key(key);
        match self.store.set_if_absent(&store_key, owner, ttl).await {
            Ok(true) => {
                debug!(lock_key = %store_key, %owner, ttl_secs = ttl.as_secs(), "convergence lock acquired");
                true
            }
            Ok(false) => {
                info!(lock_key = %store_key, "alert converged; diagnosis already running or recent");
                false
            }
            Err(err) => {
                warn!(lock_key = %store_key, error = %err, "lock store unavailable; admitting without convergence");
                true
            }
        }
    }

    /// Drop the entry so the same condition can be diagnosed again
    /// immediately. Only the owner that was admitted can release it; once the
    /// entry expired and another session took it over, this is a no-op.
    pub async fn release(&self, key: &str, owner: &str) {
        let store_key = self.store_key(key);
        match self.store.delete_if_owner(&store_key, owner).await {
            Ok(true) => info!(lock_key = %store_key, %owner, "convergence lock released"),
            Ok(false) => debug!(
                lock_key = %store_key,
                %owner,
                "convergence lock not held by owner; leaving it"
            ),
            Err(err) => warn!(lock_key = %store_key, error = %err, "failed to release convergence lock"),
        }
    }
}

impl std::fmt::Debug for ConvergenceGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvergenceGate")
            .field("key_prefix", &self.key_prefix)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
