//! Query telemetry: per-key hit counts and slow-query records.
//!
//! # Components
//!
//! - [`StatsStore`]: the relational store behind the `queries` and
//!   `slow_queries` tables, with MySQL and SQLite implementations.
//! - [`StatsRecorder`]: applies one completed request to both tables.
//! - [`StatsReport`]: the aggregated view served by the stats endpoint.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod models;
pub mod mysql;
pub mod recorder;
pub mod report;
pub mod sqlite;

pub use models::{QueryHitRecord, SlowQueryRecord};
pub use mysql::MySqlStatsStore;
pub use recorder::StatsRecorder;
pub use report::StatsReport;
pub use sqlite::SqliteStatsStore;

use crate::cache::CacheKey;
use crate::config::{DatabaseConfig, DatabaseDriver};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Create the `queries` and `slow_queries` tables if they do not exist.
    async fn ensure_schema(&self) -> Result<()>;

    /// Insert `(key, 1)` or add one to the existing hit count.
    async fn increment_hitcount(&self, key: &CacheKey) -> Result<()>;

    /// Insert `(key, elapsed)` or raise the stored latency to `elapsed` when
    /// it is strictly greater. Never lowers a stored value.
    async fn record_slow_query(&self, key: &CacheKey, elapsed: Duration) -> Result<()>;

    async fn hitcounts(&self) -> Result<Vec<QueryHitRecord>>;

    /// Slow-query rows whose stored latency exceeds `threshold`.
    async fn slow_queries_over(&self, threshold: Duration) -> Result<Vec<SlowQueryRecord>>;

    async fn ping(&self) -> Result<()>;

    fn backend(&self) -> &'static str;
}

/// Open the configured stats database and, unless disabled, create the
/// tables. Fails when the database is unreachable.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn StatsStore>> {
    let store: Arc<dyn StatsStore> = match config.driver {
        DatabaseDriver::Mysql => Arc::new(MySqlStatsStore::connect(config).await?),
        DatabaseDriver::Sqlite => {
            Arc::new(SqliteStatsStore::connect(&config.sqlite_path, config.max_connections).await?)
        }
    };

    if config.create_schema {
        store.ensure_schema().await?;
        info!(backend = store.backend(), "Stats schema ready");
    }

    Ok(store)
}
