// Aggregated telemetry view
// Author: kelexine (https://github.com/kelexine)

use super::StatsStore;
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Body of the stats endpoint. Maps are ordered so identical store state
/// always renders identical output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    /// Query key to hit count, stringified.
    pub queries: BTreeMap<String, String>,
    /// Query key to worst latency (`"1.50s"`), only for rows above the
    /// threshold in force at read time.
    pub slow_queries: BTreeMap<String, String>,
}

impl StatsReport {
    /// Read both tables; no caching.
    pub async fn collect(store: &dyn StatsStore, threshold: Duration) -> Result<Self> {
        let queries = store
            .hitcounts()
            .await?
            .into_iter()
            .map(|record| (record.query, record.hitcount.to_string()))
            .collect();

        let slow_queries = store
            .slow_queries_over(threshold)
            .await?
            .into_iter()
            .map(|record| (record.query, format_seconds(record.time_taken)))
            .collect();

        Ok(Self {
            queries,
            slow_queries,
        })
    }
}

/// Seconds with two decimals and an `s` suffix.
pub fn format_seconds(seconds: f64) -> String {
    format!("{:.2}s", seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::stats::SqliteStatsStore;

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(1.5), "1.50s");
        assert_eq!(format_seconds(2.0), "2.00s");
        assert_eq!(format_seconds(1.23456), "1.23s");
    }

    #[tokio::test]
    async fn test_collect_applies_current_threshold() {
        let store = SqliteStatsStore::in_memory().await.unwrap();
        let route = CacheKey::new("/route", Some("x=1"));
        let stops = CacheKey::new("/stops", None);

        store.increment_hitcount(&route).await.unwrap();
        store.increment_hitcount(&route).await.unwrap();
        store.increment_hitcount(&stops).await.unwrap();
        store.record_slow_query(&route, Duration::from_millis(1500)).await.unwrap();
        store.record_slow_query(&stops, Duration::from_millis(1100)).await.unwrap();

        let report = StatsReport::collect(&store, Duration::from_millis(1200)).await.unwrap();

        assert_eq!(report.queries.get("/route?x=1").map(String::as_str), Some("2"));
        assert_eq!(report.queries.get("/stops?").map(String::as_str), Some("1"));
        assert_eq!(report.slow_queries.len(), 1);
        assert_eq!(report.slow_queries.get("/route?x=1").map(String::as_str), Some("1.50s"));
    }

    #[tokio::test]
    async fn test_collect_is_a_pure_read() {
        let store = SqliteStatsStore::in_memory().await.unwrap();
        store.increment_hitcount(&CacheKey::new("/route", None)).await.unwrap();

        let first = StatsReport::collect(&store, Duration::from_secs(1)).await.unwrap();
        let second = StatsReport::collect(&store, Duration::from_secs(1)).await.unwrap();
        assert_eq!(first, second);
    }
}
