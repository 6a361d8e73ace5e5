//! Pipeline metrics via the `metrics` facade.

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const ADMISSIONS_TOTAL: &str = "stampede_admissions_total";
    pub const ORDERS_MATERIALIZED_TOTAL: &str = "stampede_orders_materialized_total";
    pub const PIPELINE_RETRIES_TOTAL: &str = "stampede_pipeline_retries_total";
    pub const PIPELINE_LOCK_DEFERRALS_TOTAL: &str = "stampede_pipeline_lock_deferrals_total";
}

pub(crate) fn record_admission(outcome: &'static str) {
    counter!(names::ADMISSIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub(crate) fn record_materialized() {
    counter!(names::ORDERS_MATERIALIZED_TOTAL).increment(1);
}

pub(crate) fn record_retry() {
    counter!(names::PIPELINE_RETRIES_TOTAL).increment(1);
}

pub(crate) fn record_lock_deferral() {
    counter!(names::PIPELINE_LOCK_DEFERRALS_TOTAL).increment(1);
}
