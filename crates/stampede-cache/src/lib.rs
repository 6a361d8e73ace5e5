//! # stampede-cache
//!
//! Cache-aside engine over a key-value store, hardened against the three
//! classic failure modes of a hot cache in front of a slow source of truth:
//!
//! - **penetration** — lookups for keys absent from both cache and source of
//!   truth are capped by a short-TTL null-marker
//! - **breakdown** — a hot key's expiry triggers exactly one rebuild, either
//!   under a distributed mutex ([`CacheEngine::read_mutex`]) or off the
//!   caller's path entirely ([`CacheEngine::read_logical_expire`])
//! - **rebuild storms** — asynchronous rebuilds run on a bounded worker pool
//!
//! Values are cached as JSON strings. The loader callback is the only place
//! the source of truth is consulted; the engine decides when it runs.

mod config;
mod engine;
pub mod metrics;

pub use config::CacheConfig;
pub use engine::CacheEngine;
