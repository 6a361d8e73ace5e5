//! Domain types shared across the workspace.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Outcome of an admission attempt against the inventory gate.
///
/// `NoStock` and `DuplicatePurchase` are terminal — no retry is ever
/// appropriate for either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The attempt was admitted: stock reserved, buyer recorded, an
    /// [`OrderIntent`] enqueued. The order is not yet durable in the source
    /// of truth — materialization happens asynchronously.
    Admitted { order_id: u64 },
    /// Stock for the sku was exhausted at admission time.
    NoStock,
    /// The user already holds an admission for this sku.
    DuplicatePurchase,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }
}

/// An admitted purchase waiting to be materialized into an [`Order`].
///
/// Immutable once created. Delivered at least once; application is
/// idempotent, so redelivery is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub order_id: u64,
    pub user_id: u64,
    pub sku_id: u64,
}

/// A persisted order. At most one exists per `(user_id, sku_id)` pair, ever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub user_id: u64,
    pub sku_id: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Order {
    /// Build the order record for an admitted intent.
    pub fn from_intent(intent: &OrderIntent) -> Self {
        Self {
            id: intent.order_id,
            user_id: intent.user_id,
            sku_id: intent.sku_id,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// A delivered-but-unacknowledged message from the intent queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Queue-assigned message id, used for acknowledgement.
    pub id: String,
    pub intent: OrderIntent,
}

/// Proof of lock ownership, handed out by [`crate::LockManager::try_lock`].
///
/// Release is token-verified: only the holder of the token that established
/// the lock may delete it before TTL expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(String);

impl LockToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LockToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
