use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use redis::AsyncCommands;
use stampede_core::{CoreError, KeyValue, Result};

/// Redis strings API behind the [`KeyValue`] trait.
pub struct RedisKeyValue {
    pool: Pool,
}

impl RedisKeyValue {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> Result<Connection> {
        self.pool.get().await.map_err(CoreError::backend)
    }
}

#[async_trait]
impl KeyValue for RedisKeyValue {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(CoreError::backend)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn().await?;
        match ttl {
            Some(ttl) => conn
                .pset_ex::<_, _, ()>(key, value, ttl.as_millis() as u64)
                .await
                .map_err(CoreError::backend),
            None => conn
                .set::<_, _, ()>(key, value)
                .await
                .map_err(CoreError::backend),
        }
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn().await?;
        let written = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async::<Option<String>>(&mut conn)
            .await
            .map_err(CoreError::backend)?;
        Ok(written.is_some())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key).await.map_err(CoreError::backend)
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn().await?;
        conn.incr::<_, _, i64>(key, 1)
            .await
            .map_err(CoreError::backend)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn().await?;
        conn.pexpire::<_, bool>(key, ttl.as_millis() as i64)
            .await
            .map_err(CoreError::backend)
    }
}
