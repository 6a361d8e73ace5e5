//! Cache metrics via the `metrics` facade.
//!
//! The engine only records; installing an exporter (Prometheus or
//! otherwise) is the host application's concern.

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "stampede_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "stampede_cache_misses_total";
    pub const CACHE_STALE_SERVES_TOTAL: &str = "stampede_cache_stale_serves_total";
    pub const CACHE_REBUILDS_TOTAL: &str = "stampede_cache_rebuilds_total";
    pub const CACHE_CORRUPT_ENTRIES_TOTAL: &str = "stampede_cache_corrupt_entries_total";
}

pub(crate) fn record_hit(strategy: &'static str) {
    counter!(names::CACHE_HITS_TOTAL, "strategy" => strategy).increment(1);
}

pub(crate) fn record_miss(strategy: &'static str) {
    counter!(names::CACHE_MISSES_TOTAL, "strategy" => strategy).increment(1);
}

pub(crate) fn record_stale_serve() {
    counter!(names::CACHE_STALE_SERVES_TOTAL).increment(1);
}

pub(crate) fn record_rebuild() {
    counter!(names::CACHE_REBUILDS_TOTAL).increment(1);
}

pub(crate) fn record_corrupt_entry() {
    counter!(names::CACHE_CORRUPT_ENTRIES_TOTAL).increment(1);
}
