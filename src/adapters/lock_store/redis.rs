//! Redis lock store using `SET key value NX PX ttl`.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::info;

use crate::domain::errors::LockStoreError;

/// Deletes `KEYS[1]` only while it still holds the caller's owner marker.
const DELETE_IF_OWNER: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
";
use crate::domain::ports::LockStore;
use crate::infrastructure::logging::secret_scrubbing::scrub;

/// Shared Redis lock store.
///
/// The connection manager reconnects on its own and is cheap to clone, so one
/// instance is built at startup and shared by every gate check.
#[derive(Clone)]
pub struct RedisLockStore {
    connection: ConnectionManager,
}

impl RedisLockStore {
    pub async fn connect(redis_url: &str) -> Result<Self, LockStoreError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| LockStoreError::Connection(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| LockStoreError::Connection(e.to_string()))?;
        info!(url = %scrub(redis_url), "connected to redis lock store");
        Ok(Self { connection })
    }
}

impl std::fmt::Debug for RedisLockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLockStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, LockStoreError> {
        let mut conn = self.connection.clone();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        // SET NX replies OK when written and nil when the key already exists.
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn delete_if_owner(&self, key: &str, owner: &str) -> Result<bool, LockStoreError> {
        let mut conn = self.connection.clone();
        let removed: i64 = redis::Script::new(DELETE_IF_OWNER)
            .key(key)
            .arg(owner)
            .invoke_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }
}
