use std::time::Duration;

use serde::Deserialize;
use stampede_core::{CoreError, Result};

/// Cache engine tuning. Every field has a sensible default, so callers and
/// config files only override what they care about.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// TTL for null-markers written after a confirmed source-of-truth miss.
    /// Bounds how often a hot missing key can reach the loader.
    #[serde(default = "default_null_ttl_ms")]
    pub null_ttl_ms: u64,

    /// TTL on rebuild locks. Bounds the blast radius of a crashed rebuilder.
    #[serde(default = "default_lock_ttl_ms")]
    pub lock_ttl_ms: u64,

    /// Sleep between `read_mutex` lock-acquisition attempts.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Parallelism bound of the asynchronous rebuild pool.
    #[serde(default = "default_rebuild_workers")]
    pub rebuild_workers: usize,
}

fn default_null_ttl_ms() -> u64 {
    120_000
}

fn default_lock_ttl_ms() -> u64 {
    10_000
}

fn default_retry_backoff_ms() -> u64 {
    50
}

fn default_rebuild_workers() -> usize {
    10
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            null_ttl_ms: default_null_ttl_ms(),
            lock_ttl_ms: default_lock_ttl_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            rebuild_workers: default_rebuild_workers(),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.null_ttl_ms == 0 {
            return Err(CoreError::backend("cache.null_ttl_ms must be > 0"));
        }
        if self.lock_ttl_ms == 0 {
            return Err(CoreError::backend("cache.lock_ttl_ms must be > 0"));
        }
        if self.rebuild_workers == 0 {
            return Err(CoreError::backend("cache.rebuild_workers must be > 0"));
        }
        Ok(())
    }

    pub fn null_ttl(&self) -> Duration {
        Duration::from_millis(self.null_ttl_ms)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_millis(self.lock_ttl_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
