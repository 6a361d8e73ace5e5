//! # stampede-redis
//!
//! Redis implementations of the `stampede-core` backend traits:
//!
//! - [`RedisKeyValue`] — strings API over a `deadpool-redis` pool
//! - [`RedisLockManager`] — `SET NX PX` acquisition with a token-verified
//!   compare-and-delete release script
//! - [`RedisInventoryGate`] — the admission Lua script: stock check,
//!   per-sku buyer set, decrement and stream append in one atomic
//!   evaluation
//! - [`RedisIntentQueue`] — Redis Streams consumer group with blocking
//!   reads, explicit acknowledgement and pending-backlog redelivery
//!
//! Connection pooling is configured through [`RedisConfig`]; stream, group
//! and consumer names through [`StreamConfig`].

mod config;
mod gate;
mod kv;
mod lock;
mod queue;

pub use config::{RedisConfig, StreamConfig};
pub use gate::RedisInventoryGate;
pub use kv::RedisKeyValue;
pub use lock::RedisLockManager;
pub use queue::RedisIntentQueue;
