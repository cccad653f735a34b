//! Row types of the telemetry tables.

// Author: kelexine (https://github.com/kelexine)

/// A row of `queries`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHitRecord {
    pub query: String,
    /// Number of HTTP 200 responses served for `query`.
    pub hitcount: i64,
}

/// A row of `slow_queries`.
#[derive(Debug, Clone, PartialEq)]
pub struct SlowQueryRecord {
    pub query: String,
    /// Worst latency observed for `query`, in seconds.
    pub time_taken: f64,
}
