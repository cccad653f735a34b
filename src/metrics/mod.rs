// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics,
    REQUESTS_TOTAL,
    REQUEST_DURATION,
    CACHE_OPERATIONS,
    UPSTREAM_CALLS,
    UPSTREAM_DURATION,
    BACKGROUND_JOBS,
    BACKGROUND_PENDING,
};

/// Helper to record request metrics
pub fn record_request(status_code: u16, duration_secs: f64) {
    let status = status_code.to_string();
    REQUESTS_TOTAL.with_label_values(&[&status]).inc();
    REQUEST_DURATION.with_label_values(&[&status]).observe(duration_secs);
}

/// Helper to record cache operations
pub fn record_cache_hit() {
    CACHE_OPERATIONS.with_label_values(&["hit"]).inc();
}

pub fn record_cache_miss() {
    CACHE_OPERATIONS.with_label_values(&["miss"]).inc();
}

pub fn record_cache_lookup_error() {
    CACHE_OPERATIONS.with_label_values(&["lookup_error"]).inc();
}

pub fn record_cache_store(success: bool) {
    let operation = if success { "store" } else { "store_error" };
    CACHE_OPERATIONS.with_label_values(&[operation]).inc();
}

/// Helper to record upstream fetches; `status_code` is `None` on transport failure
pub fn record_upstream_call(status_code: Option<u16>, duration_secs: f64) {
    let outcome = status_code
        .map(|s| s.to_string())
        .unwrap_or_else(|| "transport_error".to_string());
    UPSTREAM_CALLS.with_label_values(&[&outcome]).inc();
    UPSTREAM_DURATION.with_label_values(&[&outcome]).observe(duration_secs);
}

/// Helper to record background job outcomes
pub fn record_job(kind: &str, outcome: &str) {
    BACKGROUND_JOBS.with_label_values(&[kind, outcome]).inc();
}
