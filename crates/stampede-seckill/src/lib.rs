//! # stampede-seckill
//!
//! Flash-sale order flow in two halves:
//!
//! - [`SeckillService`] — synchronous admission: generate an order id, run
//!   the atomic stock-check-and-reserve against the inventory gate, and
//!   answer the caller immediately. An admitted attempt is queued, not yet
//!   durable.
//! - [`OrderPipeline`] — a single long-lived consumer that drains the
//!   intent queue, serializes same-user work behind a distributed lock, and
//!   materializes orders against the source of truth idempotently, so
//!   at-least-once delivery still yields at most one order per
//!   `(user, sku)` and at most one inventory deduction per admission.
//!
//! Pipeline failures are invisible to the original caller (the response
//! went out at admission time); they surface through logs and metrics and
//! are retried by the pending-backlog recovery loop.

mod config;
pub mod metrics;
mod pipeline;
mod service;

pub use config::PipelineConfig;
pub use pipeline::OrderPipeline;
pub use service::SeckillService;
