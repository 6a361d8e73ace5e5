use std::time::Duration;

use deadpool_redis::{Pool, PoolConfig, Runtime};
use serde::Deserialize;
use stampede_core::{CoreError, Result};

/// Redis connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection acquire timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    16
}

fn default_redis_timeout_ms() -> u64 {
    5_000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

impl RedisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(CoreError::backend("redis.pool_size must be > 0"));
        }
        if self.timeout_ms == 0 {
            return Err(CoreError::backend("redis.timeout_ms must be > 0"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Build the shared connection pool.
    pub fn create_pool(&self) -> Result<Pool> {
        self.validate()?;
        let mut config = deadpool_redis::Config::from_url(&self.url);
        let mut pool = PoolConfig::new(self.pool_size);
        pool.timeouts.wait = Some(self.timeout());
        pool.timeouts.create = Some(self.timeout());
        config.pool = Some(pool);
        config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(CoreError::backend)
    }
}

/// Names for the order intent stream and its consumer group.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_stream")]
    pub stream: String,

    #[serde(default = "default_group")]
    pub group: String,

    #[serde(default = "default_consumer")]
    pub consumer: String,
}

fn default_stream() -> String {
    "stream.orders".to_string()
}

fn default_group() -> String {
    "g1".to_string()
}

fn default_consumer() -> String {
    "c1".to_string()
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            stream: default_stream(),
            group: default_group(),
            consumer: default_consumer(),
        }
    }
}
