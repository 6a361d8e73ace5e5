//! # stampede-memory
//!
//! In-memory implementations of every `stampede-core` backend trait.
//!
//! These backends exist for deterministic tests and single-process
//! embedding. They honor the same contracts as the Redis backends,
//! including the ones tests depend on:
//! - [`MemoryKeyValue`] expires entries by deadline, exactly like a
//!   physical TTL
//! - [`MemoryLockManager`] hands out ownership tokens and refuses a release
//!   carrying a stale token
//! - [`MemoryQueue`] keeps an explicit pending (delivered-unacknowledged)
//!   list so the recovery loop can be exercised
//! - [`MemoryInventoryGate`] applies its three admission effects under one
//!   mutex, mirroring the atomicity of the Redis admission script

mod gate;
mod kv;
mod lock;
mod queue;
mod store;

pub use gate::MemoryInventoryGate;
pub use kv::MemoryKeyValue;
pub use lock::MemoryLockManager;
pub use queue::MemoryQueue;
pub use store::MemoryOrderStore;
