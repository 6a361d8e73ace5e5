use std::time::Duration;

use serde::Deserialize;
use stampede_core::{CoreError, Result};

/// Order pipeline tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on a blocking queue read. Keeps the consumer observable
    /// and shutdownable without busy-spinning on an empty queue.
    #[serde(default = "default_block_ms")]
    pub block_ms: u64,

    /// Sleep between recovery-loop attempts after a failure.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// TTL on per-user order locks.
    #[serde(default = "default_lock_ttl_ms")]
    pub lock_ttl_ms: u64,
}

fn default_block_ms() -> u64 {
    2_000
}

fn default_retry_backoff_ms() -> u64 {
    20
}

fn default_lock_ttl_ms() -> u64 {
    10_000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            block_ms: default_block_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            lock_ttl_ms: default_lock_ttl_ms(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.block_ms == 0 {
            return Err(CoreError::backend("pipeline.block_ms must be > 0"));
        }
        if self.lock_ttl_ms == 0 {
            return Err(CoreError::backend("pipeline.lock_ttl_ms must be > 0"));
        }
        Ok(())
    }

    pub fn block(&self) -> Duration {
        Duration::from_millis(self.block_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_millis(self.lock_ttl_ms)
    }
}
