use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use stampede_core::{LockManager, LockToken, Result};
use uuid::Uuid;

#[derive(Debug)]
struct Held {
    token: String,
    deadline: Instant,
}

/// In-process lock table with deadline-based expiry and token-verified
/// release, mirroring the Redis set-nx + compare-and-delete lock.
#[derive(Debug, Default)]
pub struct MemoryLockManager {
    locks: DashMap<String, Held>,
}

impl MemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockManager for MemoryLockManager {
    async fn try_lock(&self, name: &str, ttl: Duration) -> Result<Option<LockToken>> {
        let token = Uuid::new_v4().to_string();
        let held = Held {
            token: token.clone(),
            deadline: Instant::now() + ttl,
        };
        match self.locks.entry(name.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().deadline > Instant::now() {
                    return Ok(None);
                }
                // Expired holder: the lock is free for the taking.
                occupied.insert(held);
                Ok(Some(LockToken::new(token)))
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(held);
                Ok(Some(LockToken::new(token)))
            }
        }
    }

    async fn unlock(&self, name: &str, token: &LockToken) -> Result<bool> {
        let released = self
            .locks
            .remove_if(name, |_, held| held.token == token.as_str())
            .is_some();
        if !released {
            tracing::warn!(
                name = %name,
                "unlock refused: token is stale (lock TTL elapsed and may be re-held)"
            );
        }
        Ok(released)
    }
}
