//! # stampede-core
//!
//! Core types and backend traits for the stampede toolkit.
//!
//! This crate defines the contracts shared by every backend:
//! - [`KeyValue`] — the key-value store fronting the source of truth
//! - [`LockManager`] — named, TTL-bounded, token-verified mutual exclusion
//! - [`IntentQueue`] — a durable queue with consumer-group semantics
//!   (acknowledgement plus a recoverable pending list)
//! - [`InventoryGate`] — atomic stock-check-and-reserve admission
//! - [`OrderStore`] — the source-of-truth side of order materialization
//!
//! It does not contain any backend implementations — those are provided by
//! `stampede-redis` (production) and `stampede-memory` (tests and
//! single-process embedding).

mod error;
mod id;
mod traits;
mod types;

pub use error::{BoxError, CoreError, Result};
pub use id::{ID_EPOCH, SEQUENCE_BITS, TimestampIdGenerator};
pub use traits::{IntentQueue, InventoryGate, KeyValue, LockManager, OrderStore};
pub use types::{Admission, LockToken, Order, OrderIntent, QueueMessage};
