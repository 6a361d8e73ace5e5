use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::Script;
use stampede_core::{CoreError, LockManager, LockToken, Result};
use uuid::Uuid;

static UNLOCK_SCRIPT: LazyLock<Script> =
    LazyLock::new(|| Script::new(include_str!("../scripts/unlock.lua")));

/// Distributed lock over Redis: `SET name token NX PX ttl` to acquire,
/// compare-and-delete script to release.
///
/// The token check closes the TTL race: a holder whose lock expired and was
/// re-acquired elsewhere cannot release the new holder's lock.
pub struct RedisLockManager {
    pool: Pool,
}

impl RedisLockManager {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LockManager for RedisLockManager {
    async fn try_lock(&self, name: &str, ttl: Duration) -> Result<Option<LockToken>> {
        let mut conn = self.pool.get().await.map_err(CoreError::backend)?;
        let token = Uuid::new_v4().to_string();
        let acquired = redis::cmd("SET")
            .arg(name)
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async::<Option<String>>(&mut conn)
            .await
            .map_err(CoreError::backend)?;
        Ok(acquired.map(|_| LockToken::new(token)))
    }

    async fn unlock(&self, name: &str, token: &LockToken) -> Result<bool> {
        let mut conn = self.pool.get().await.map_err(CoreError::backend)?;
        let deleted = UNLOCK_SCRIPT
            .key(name)
            .arg(token.as_str())
            .invoke_async::<i64>(&mut conn)
            .await
            .map_err(CoreError::backend)?;
        if deleted == 0 {
            tracing::warn!(
                name = %name,
                "unlock refused: token is stale (lock TTL elapsed and may be re-held)"
            );
        }
        Ok(deleted == 1)
    }
}
