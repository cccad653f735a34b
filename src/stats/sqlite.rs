// SQLite telemetry store
// Author: kelexine (https://github.com/kelexine)

use super::{QueryHitRecord, SlowQueryRecord, StatsStore};
use crate::cache::CacheKey;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const CREATE_QUERIES: &str = r#"
CREATE TABLE IF NOT EXISTS queries (
    query TEXT NOT NULL PRIMARY KEY,
    hitcount INTEGER NOT NULL
)
"#;

const CREATE_SLOW_QUERIES: &str = r#"
CREATE TABLE IF NOT EXISTS slow_queries (
    query TEXT NOT NULL PRIMARY KEY,
    time_taken REAL NOT NULL
)
"#;

const UPSERT_HITCOUNT: &str = r#"
INSERT INTO queries (query, hitcount)
VALUES (?, 1)
ON CONFLICT(query) DO UPDATE SET hitcount = hitcount + 1
"#;

const UPSERT_SLOW_QUERY: &str = r#"
INSERT INTO slow_queries (query, time_taken)
VALUES (?, ?)
ON CONFLICT(query) DO UPDATE SET time_taken = MAX(time_taken, excluded.time_taken)
"#;

pub struct SqliteStatsStore {
    pool: SqlitePool,
}

impl SqliteStatsStore {
    /// Open (creating if needed) the database at `path`. `:memory:` gives a
    /// private in-memory database held by a single pinned connection.
    pub async fn connect(path: &str, max_connections: u32) -> Result<Self> {
        let pool = if path == ":memory:" {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await?
        } else {
            let options =
                SqliteConnectOptions::from_str(&format!("sqlite://{}", path))?.create_if_missing(true);
            SqlitePoolOptions::new()
                .max_connections(max_connections)
                .connect_with(options)
                .await?
        };

        let store = Self { pool };
        store.ping().await?;

        info!(path, "Opened SQLite stats database");
        Ok(store)
    }

    /// In-memory store with the schema already created.
    pub async fn in_memory() -> Result<Self> {
        let store = Self::connect(":memory:", 1).await?;
        store.ensure_schema().await?;
        Ok(store)
    }
}

#[async_trait]
impl StatsStore for SqliteStatsStore {
    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_QUERIES).execute(&self.pool).await?;
        sqlx::query(CREATE_SLOW_QUERIES).execute(&self.pool).await?;
        Ok(())
    }

    async fn increment_hitcount(&self, key: &CacheKey) -> Result<()> {
        sqlx::query(UPSERT_HITCOUNT)
            .bind(key.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_slow_query(&self, key: &CacheKey, elapsed: Duration) -> Result<()> {
        sqlx::query(UPSERT_SLOW_QUERY)
            .bind(key.as_str())
            .bind(elapsed.as_secs_f64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn hitcounts(&self) -> Result<Vec<QueryHitRecord>> {
        let rows = sqlx::query("SELECT query, hitcount FROM queries")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| -> Result<_> {
                Ok(QueryHitRecord {
                    query: row.try_get("query")?,
                    hitcount: row.try_get("hitcount")?,
                })
            })
            .collect()
    }

    async fn slow_queries_over(&self, threshold: Duration) -> Result<Vec<SlowQueryRecord>> {
        let rows = sqlx::query("SELECT query, time_taken FROM slow_queries WHERE time_taken > ?")
            .bind(threshold.as_secs_f64())
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| -> Result<_> {
                Ok(SlowQueryRecord {
                    query: row.try_get("query")?,
                    time_taken: row.try_get("time_taken")?,
                })
            })
            .collect()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
