//! Backend traits for the stampede abstraction layer.
//!
//! All traits are object-safe and `Send + Sync`, so components hold them as
//! `Arc<dyn …>` and can be wired against Redis in production or the
//! in-memory backends in tests.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Admission, LockToken, Order, QueueMessage};

/// Minimal key-value store surface consumed by the cache engine, the lock
/// manager and the id generator.
///
/// Values are JSON strings; the store does not interpret them beyond the
/// reserved null-marker (the empty string), which callers use to represent a
/// confirmed miss in the source of truth.
#[async_trait]
pub trait KeyValue: Send + Sync {
    /// Read a key. `Ok(None)` means the key is absent, which is distinct
    /// from the null-marker (`Ok(Some(""))`).
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a key, with a physical TTL when `ttl` is `Some`. A `None` TTL
    /// stores the key indefinitely (logical-expiry entries rely on this).
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Conditional set-if-absent with a TTL. Returns whether the key was
    /// written.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Unconditional delete.
    async fn del(&self, key: &str) -> Result<()>;

    /// Atomically increment the integer at `key`, creating it at zero first
    /// if absent. Returns the post-increment value.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Apply a TTL to an existing key. Returns false if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;
}

/// Named, TTL-bounded mutual exclusion across processes sharing one store.
///
/// Lock names are namespaced per logical resource (`lock:shop:{id}`,
/// `lock:order:{user}`); locks for different resources never contend.
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Non-blocking acquisition attempt. Returns the ownership token on
    /// success, `None` when another process holds the lock. No retry inside.
    async fn try_lock(&self, name: &str, ttl: Duration) -> Result<Option<LockToken>>;

    /// Token-verified release. Returns `false` when the token no longer owns
    /// the lock — the TTL elapsed and another process may have re-acquired
    /// it, in which case nothing is deleted.
    async fn unlock(&self, name: &str, token: &LockToken) -> Result<bool>;
}

/// Atomic admission: decide in one indivisible evaluation whether a purchase
/// attempt reserves inventory.
#[async_trait]
pub trait InventoryGate: Send + Sync {
    /// Check stock, check the per-sku buyer set, and on success decrement
    /// stock, record the buyer and enqueue the order intent — all within the
    /// same atomic evaluation. No interleaving request can observe a
    /// partially-applied state.
    async fn admit(&self, sku_id: u64, user_id: u64, order_id: u64) -> Result<Admission>;

    /// Publish (or reset) the fast-path stock counter for a sku. Called when
    /// a sale is set up, before any admission traffic arrives.
    async fn seed_stock(&self, sku_id: u64, stock: i64) -> Result<()>;
}

/// Durable queue with consumer-group semantics: per-message acknowledgement
/// plus a recoverable pending (delivered-unacknowledged) list.
#[async_trait]
pub trait IntentQueue: Send + Sync {
    /// Create the consumer group if it does not exist yet. Idempotent:
    /// "already exists" is not an error.
    async fn ensure_group(&self) -> Result<()>;

    /// Append an order intent to the queue.
    async fn enqueue(&self, intent: &crate::OrderIntent) -> Result<()>;

    /// Read one not-yet-delivered message, blocking up to `block` when the
    /// queue is empty. Delivered messages move to the pending list until
    /// acknowledged.
    async fn read_new(&self, block: Duration) -> Result<Option<QueueMessage>>;

    /// Read one message from this consumer's pending backlog, oldest first.
    /// `Ok(None)` means the backlog is fully drained.
    async fn read_pending(&self) -> Result<Option<QueueMessage>>;

    /// Acknowledge a delivered message, removing it from the pending list.
    async fn ack(&self, message_id: &str) -> Result<()>;
}

/// The source-of-truth side of order materialization. Implemented over the
/// external database; the core only issues conditional mutations through it.
///
/// Implementations are expected to execute a materialization sequence
/// (count, decrement, persist) against a single transactional session and to
/// back `persist_order` with a unique index on `(user_id, sku_id)` so a
/// duplicate insert fails instead of silently succeeding.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Number of orders already persisted for `(user_id, sku_id)`. Used as
    /// the redundant uniqueness re-check before creating an order.
    async fn count_orders(&self, user_id: u64, sku_id: u64) -> Result<u64>;

    /// Decrement stock for the sku only if it is currently positive.
    /// Returns whether a decrement happened.
    async fn decrement_stock_if_positive(&self, sku_id: u64) -> Result<bool>;

    /// Insert the order record. Fails on a `(user_id, sku_id)` uniqueness
    /// violation.
    async fn persist_order(&self, order: &Order) -> Result<()>;
}
