// Per-request telemetry updates
// Author: kelexine (https://github.com/kelexine)

use super::StatsStore;
use crate::cache::CacheKey;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Applies one completed (HTTP 200) request to the telemetry tables.
///
/// Runs off the request path. Store failures are logged and swallowed: the
/// rows keep their previous values and serving continues.
#[derive(Clone)]
pub struct StatsRecorder {
    store: Arc<dyn StatsStore>,
    threshold: Duration,
}

impl StatsRecorder {
    pub fn new(store: Arc<dyn StatsStore>, threshold: Duration) -> Self {
        Self { store, threshold }
    }

    /// Bump the hit count and, when `elapsed` exceeds the threshold, the
    /// slow-query maximum. The two upserts are independent and run
    /// concurrently. Returns `true` when every attempted update succeeded.
    pub async fn record(&self, key: &CacheKey, elapsed: Duration) -> bool {
        let hitcount = async {
            match self.store.increment_hitcount(key).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(query = %key, "Failed to update hit count: {}", e);
                    false
                }
            }
        };

        let slow_query = async {
            if elapsed <= self.threshold {
                return true;
            }
            match self.store.record_slow_query(key, elapsed).await {
                Ok(()) => {
                    debug!(query = %key, elapsed_ms = elapsed.as_millis() as u64, "Slow query recorded");
                    true
                }
                Err(e) => {
                    warn!(query = %key, "Failed to update slow query: {}", e);
                    false
                }
            }
        };

        let (hitcount_ok, slow_query_ok) = tokio::join!(hitcount, slow_query);
        hitcount_ok && slow_query_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProxyError, Result};
    use crate::stats::{QueryHitRecord, SlowQueryRecord, SqliteStatsStore};
    use async_trait::async_trait;

    fn key() -> CacheKey {
        CacheKey::new("/route", Some("x=1"))
    }

    #[tokio::test]
    async fn test_fast_request_only_counts_hit() {
        let store = Arc::new(SqliteStatsStore::in_memory().await.unwrap());
        let recorder = StatsRecorder::new(store.clone(), Duration::from_secs(1));

        assert!(recorder.record(&key(), Duration::from_millis(50)).await);

        assert_eq!(store.hitcounts().await.unwrap()[0].hitcount, 1);
        assert!(store.slow_queries_over(Duration::ZERO).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_latency_equal_to_threshold_is_not_slow() {
        let store = Arc::new(SqliteStatsStore::in_memory().await.unwrap());
        let recorder = StatsRecorder::new(store.clone(), Duration::from_secs(1));

        recorder.record(&key(), Duration::from_secs(1)).await;

        assert!(store.slow_queries_over(Duration::ZERO).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_slow_requests_keep_worst_latency() {
        let store = Arc::new(SqliteStatsStore::in_memory().await.unwrap());
        let recorder = StatsRecorder::new(store.clone(), Duration::from_secs(1));

        recorder.record(&key(), Duration::from_millis(1500)).await;
        recorder.record(&key(), Duration::from_millis(1200)).await;
        recorder.record(&key(), Duration::from_millis(300)).await;

        assert_eq!(store.hitcounts().await.unwrap()[0].hitcount, 3);
        let slow = store.slow_queries_over(Duration::ZERO).await.unwrap();
        assert_eq!(slow.len(), 1);
        assert!((slow[0].time_taken - 1.5).abs() < 1e-9);
    }

    struct BrokenHitcounts {
        inner: SqliteStatsStore,
    }

    #[async_trait]
    impl StatsStore for BrokenHitcounts {
        async fn ensure_schema(&self) -> Result<()> {
            self.inner.ensure_schema().await
        }
        async fn increment_hitcount(&self, _key: &CacheKey) -> Result<()> {
            Err(ProxyError::Internal("prepare failed".to_string()))
        }
        async fn record_slow_query(&self, key: &CacheKey, elapsed: Duration) -> Result<()> {
            self.inner.record_slow_query(key, elapsed).await
        }
        async fn hitcounts(&self) -> Result<Vec<QueryHitRecord>> {
            self.inner.hitcounts().await
        }
        async fn slow_queries_over(&self, threshold: Duration) -> Result<Vec<SlowQueryRecord>> {
            self.inner.slow_queries_over(threshold).await
        }
        async fn ping(&self) -> Result<()> {
            Ok(())
        }
        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_failed_hitcount_does_not_block_slow_query() {
        let store = Arc::new(BrokenHitcounts {
            inner: SqliteStatsStore::in_memory().await.unwrap(),
        });
        let recorder = StatsRecorder::new(store.clone(), Duration::from_secs(1));

        assert!(!recorder.record(&key(), Duration::from_secs(2)).await);

        assert!(store.hitcounts().await.unwrap().is_empty());
        assert_eq!(store.slow_queries_over(Duration::ZERO).await.unwrap().len(), 1);
    }
}
