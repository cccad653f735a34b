// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, HistogramVec, IntGauge, Opts, Registry, TextEncoder, Encoder,
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
    register_int_gauge_with_registry,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // REQUEST METRICS
    // ============================================================================

    /// Total number of proxied requests
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("proxy_requests_total", "Total number of proxied requests"),
        &["status_code"],
        REGISTRY
    ).unwrap();

    /// Request duration histogram
    pub static ref REQUEST_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("proxy_request_duration_seconds", "Request duration in seconds")
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["status_code"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Cache operations
    pub static ref CACHE_OPERATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("cache_operations_total", "Total cache operations"),
        &["operation"], // operation: hit, miss, lookup_error, store, store_error
        REGISTRY
    ).unwrap();

    // ============================================================================
    // UPSTREAM METRICS
    // ============================================================================

    /// Upstream fetches
    pub static ref UPSTREAM_CALLS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("upstream_calls_total", "Total upstream fetches"),
        &["outcome"], // outcome: status code or "transport_error"
        REGISTRY
    ).unwrap();

    /// Upstream fetch duration
    pub static ref UPSTREAM_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("upstream_duration_seconds", "Upstream fetch duration")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["outcome"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // BACKGROUND WORK METRICS
    // ============================================================================

    /// Background jobs by kind and outcome
    pub static ref BACKGROUND_JOBS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("background_jobs_total", "Total background jobs"),
        &["kind", "outcome"], // outcome: completed, failed, dropped
        REGISTRY
    ).unwrap();

    /// Jobs accepted but not yet finished
    pub static ref BACKGROUND_PENDING: IntGauge = register_int_gauge_with_registry!(
        Opts::new("background_jobs_pending", "Background jobs queued or running"),
        REGISTRY
    ).unwrap();
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> String {
    // Plain collectors register on first use; the gauge must show from startup
    lazy_static::initialize(&BACKGROUND_PENDING);

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // Vec collectors only show up once a label set has been touched
        REQUESTS_TOTAL.with_label_values(&["200"]).inc_by(0.0);
        CACHE_OPERATIONS.with_label_values(&["hit"]).inc_by(0.0);
        BACKGROUND_JOBS.with_label_values(&["record_stats", "completed"]).inc_by(0.0);

        let metrics = gather_metrics();
        assert!(metrics.contains("proxy_requests_total"));
        assert!(metrics.contains("cache_operations_total"));
        assert!(metrics.contains("background_jobs_total"));
        assert!(metrics.contains("background_jobs_pending"));
    }

    #[test]
    fn test_pending_gauge_exported_before_first_job() {
        let metrics = gather_metrics();
        assert!(metrics.contains("# TYPE background_jobs_pending gauge"));
    }
}
