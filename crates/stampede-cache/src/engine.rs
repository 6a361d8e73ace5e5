use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stampede_core::{BoxError, CoreError, KeyValue, LockManager, Result};
use time::OffsetDateTime;
use tokio::sync::Semaphore;
use tokio::time::sleep;

use crate::config::CacheConfig;
use crate::metrics;

/// Reserved value for a confirmed source-of-truth miss. Distinct from
/// absence; always stored with the short null TTL.
const NULL_MARKER: &str = "";

/// Namespace for per-key rebuild locks.
const REBUILD_LOCK_PREFIX: &str = "lock:cache:";

/// Logical-expiry envelope. Stored with no physical TTL; staleness lives in
/// `expire_at` (unix milliseconds) instead.
#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    data: T,
    expire_at: i64,
}

fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Decode a cached hit. A malformed entry is corruption: recorded, logged,
/// and reported as [`CoreError::CorruptEntry`] so callers fall back to
/// their miss path — partial data is never served.
fn decode_entry<T: DeserializeOwned>(key: &str, json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|error| {
        metrics::record_corrupt_entry();
        tracing::warn!(key = %key, error = %error, "corrupt cache entry, treating as miss");
        CoreError::CorruptEntry {
            key: key.to_string(),
        }
    })
}

/// Cache-aside engine over any [`KeyValue`] backend.
///
/// Read strategies are parameterized by a key prefix, a displayable id, a
/// target type and a **loader** — an async callback from id to
/// value-or-absent representing the source-of-truth read. The engine only
/// orchestrates when the loader runs; it never touches the source of truth
/// itself.
#[derive(Clone)]
pub struct CacheEngine {
    kv: Arc<dyn KeyValue>,
    locks: Arc<dyn LockManager>,
    rebuilds: Arc<Semaphore>,
    config: CacheConfig,
}

impl CacheEngine {
    pub fn new(kv: Arc<dyn KeyValue>, locks: Arc<dyn LockManager>, config: CacheConfig) -> Self {
        let rebuilds = Arc::new(Semaphore::new(config.rebuild_workers));
        Self {
            kv,
            locks,
            rebuilds,
            config,
        }
    }

    /// Serialize `value` and store it under `key` with a physical TTL.
    pub async fn write<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        self.kv
            .set(key, &serde_json::to_string(value)?, Some(ttl))
            .await
    }

    /// Wrap `value` in a logical-expiry envelope and store it with **no**
    /// physical TTL. The entry survives until explicitly rebuilt or evicted.
    pub async fn write_logical<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        logical_ttl: Duration,
    ) -> Result<()> {
        let envelope = Envelope {
            data: value,
            expire_at: now_millis() + logical_ttl.as_millis() as i64,
        };
        self.kv
            .set(key, &serde_json::to_string(&envelope)?, None)
            .await
    }

    /// Drop a cached entry. Write paths call this after mutating the source
    /// of truth so the next read repopulates.
    pub async fn evict(&self, key: &str) -> Result<()> {
        self.kv.del(key).await
    }

    /// Cache-aside read with null-marker penetration protection and no
    /// rebuild coordination.
    ///
    /// A hot missing key reaches the loader at most once per null-TTL
    /// window system-wide probabilistically (no lock) — acceptable because
    /// the miss path is cheap.
    pub async fn read_pass_through<T, ID, F, Fut>(
        &self,
        prefix: &str,
        id: ID,
        ttl: Duration,
        loader: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        ID: Display,
        F: FnOnce(ID) -> Fut,
        Fut: Future<Output = std::result::Result<Option<T>, BoxError>>,
    {
        let key = format!("{prefix}{id}");
        if let Some(json) = self.kv.get(&key).await? {
            if json == NULL_MARKER {
                metrics::record_hit("pass_through_null");
                return Ok(None);
            }
            // A corrupt entry falls through to the loader and is overwritten.
            if let Ok(value) = decode_entry(&key, &json) {
                metrics::record_hit("pass_through");
                return Ok(Some(value));
            }
        }
        metrics::record_miss("pass_through");

        match loader(id).await.map_err(CoreError::source)? {
            Some(value) => {
                self.write(&key, &value, ttl).await?;
                Ok(Some(value))
            }
            None => {
                self.kv
                    .set(&key, NULL_MARKER, Some(self.config.null_ttl()))
                    .await?;
                Ok(None)
            }
        }
    }

    /// Cache-aside read where a miss rebuilds under a distributed per-key
    /// mutex: at most one in-flight loader call per key across the whole
    /// system at any instant.
    ///
    /// Lock contention sleeps a fixed backoff and retries the whole read.
    /// The retry is unbounded by design; liveness under sustained
    /// contention is the caller's timeout policy to enforce.
    pub async fn read_mutex<T, ID, F, Fut>(
        &self,
        prefix: &str,
        id: ID,
        ttl: Duration,
        loader: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        ID: Display + Clone,
        F: Fn(ID) -> Fut,
        Fut: Future<Output = std::result::Result<Option<T>, BoxError>>,
    {
        let key = format!("{prefix}{id}");
        let lock_name = format!("{REBUILD_LOCK_PREFIX}{key}");
        loop {
            if let Some(json) = self.kv.get(&key).await? {
                if json == NULL_MARKER {
                    metrics::record_hit("mutex_null");
                    return Ok(None);
                }
                // A corrupt entry is rebuilt under the lock like a miss.
                if let Ok(value) = decode_entry(&key, &json) {
                    metrics::record_hit("mutex");
                    return Ok(Some(value));
                }
            }
            metrics::record_miss("mutex");

            let Some(token) = self
                .locks
                .try_lock(&lock_name, self.config.lock_ttl())
                .await?
            else {
                sleep(self.config.retry_backoff()).await;
                continue;
            };

            let result = self.load_and_fill(&key, id.clone(), ttl, &loader).await;
            if let Err(error) = self.locks.unlock(&lock_name, &token).await {
                tracing::warn!(lock = %lock_name, error = %error, "failed to release rebuild lock");
            }
            return result;
        }
    }

    /// Loader call under the held rebuild lock, with a double-check first so
    /// a holder that queued behind a finished rebuild skips the loader.
    async fn load_and_fill<T, ID, F, Fut>(
        &self,
        key: &str,
        id: ID,
        ttl: Duration,
        loader: &F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(ID) -> Fut,
        Fut: Future<Output = std::result::Result<Option<T>, BoxError>>,
    {
        if let Some(json) = self.kv.get(key).await? {
            if json == NULL_MARKER {
                return Ok(None);
            }
            if let Ok(value) = decode_entry(key, &json) {
                return Ok(Some(value));
            }
        }

        match loader(id).await.map_err(CoreError::source)? {
            Some(value) => {
                self.write(key, &value, ttl).await?;
                Ok(Some(value))
            }
            None => {
                self.kv
                    .set(key, NULL_MARKER, Some(self.config.null_ttl()))
                    .await?;
                Ok(None)
            }
        }
    }

    /// Logical-expiry read: callers never block on a rebuild.
    ///
    /// - Absent key → absent. This strategy requires pre-warming via
    ///   [`CacheEngine::write_logical`]; it never populates on a cold miss.
    /// - Fresh envelope → the value.
    /// - Expired envelope → the stale value immediately, plus at most one
    ///   asynchronous rebuild on the bounded pool (guarded by the per-key
    ///   rebuild lock). Staleness is bounded by rebuild latency, not caller
    ///   demand.
    ///
    /// A malformed envelope is corruption, treated as a miss — partial data
    /// is never served.
    pub async fn read_logical_expire<T, ID, F, Fut>(
        &self,
        prefix: &str,
        id: ID,
        logical_ttl: Duration,
        loader: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        ID: Display + Send + 'static,
        F: FnOnce(ID) -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<Option<T>, BoxError>> + Send,
    {
        let key = format!("{prefix}{id}");
        let Some(json) = self.kv.get(&key).await? else {
            metrics::record_miss("logical");
            return Ok(None);
        };

        // This strategy never populates on a miss, so a corrupt envelope is
        // simply absent to the caller.
        let Ok(envelope) = decode_entry::<Envelope<T>>(&key, &json) else {
            return Ok(None);
        };

        if now_millis() < envelope.expire_at {
            metrics::record_hit("logical");
            return Ok(Some(envelope.data));
        }

        // Stale. Serve it immediately; rebuild off the caller's path if this
        // reader wins the rebuild lock and the pool has room.
        metrics::record_stale_serve();
        let lock_name = format!("{REBUILD_LOCK_PREFIX}{key}");
        if let Some(token) = self
            .locks
            .try_lock(&lock_name, self.config.lock_ttl())
            .await?
        {
            match Arc::clone(&self.rebuilds).try_acquire_owned() {
                Ok(permit) => {
                    let engine = self.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(error) =
                            engine.rebuild_logical(&key, id, logical_ttl, loader).await
                        {
                            tracing::warn!(key = %key, error = %error, "async cache rebuild failed");
                        }
                        if let Err(error) = engine.locks.unlock(&lock_name, &token).await {
                            tracing::warn!(lock = %lock_name, error = %error, "failed to release rebuild lock");
                        }
                    });
                }
                Err(_) => {
                    tracing::debug!(key = %key, "rebuild pool saturated, deferring to a later reader");
                    if let Err(error) = self.locks.unlock(&lock_name, &token).await {
                        tracing::warn!(lock = %lock_name, error = %error, "failed to release rebuild lock");
                    }
                }
            }
        }

        Ok(Some(envelope.data))
    }

    async fn rebuild_logical<T, ID, F, Fut>(
        &self,
        key: &str,
        id: ID,
        logical_ttl: Duration,
        loader: F,
    ) -> Result<()>
    where
        T: Serialize,
        ID: Display,
        F: FnOnce(ID) -> Fut,
        Fut: Future<Output = std::result::Result<Option<T>, BoxError>>,
    {
        match loader(id).await.map_err(CoreError::source)? {
            Some(value) => {
                self.write_logical(key, &value, logical_ttl).await?;
                metrics::record_rebuild();
                tracing::debug!(key = %key, "cache rebuilt with fresh logical expiry");
            }
            None => {
                // The row vanished from the source of truth: drop the stale
                // entry instead of refreshing it.
                self.kv.del(key).await?;
                tracing::debug!(key = %key, "source of truth lost the row, entry evicted");
            }
        }
        Ok(())
    }
}
