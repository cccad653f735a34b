// MySQL telemetry store
// Author: kelexine (https://github.com/kelexine)

use super::{QueryHitRecord, SlowQueryRecord, StatsStore};
use crate::cache::CacheKey;
use crate::config::DatabaseConfig;
use crate::error::{ProxyError, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::Row;
use std::time::Duration;
use tracing::info;

// InnoDB caps index keys at 3072 bytes: 768 utf8mb4 characters. Longer
// keys are rejected before they reach the server, so those queries get no
// telemetry rows.
const MAX_QUERY_KEY_CHARS: usize = 768;

const CREATE_QUERIES: &str = r#"
CREATE TABLE IF NOT EXISTS queries (
    query VARCHAR(768) NOT NULL PRIMARY KEY,
    hitcount BIGINT NOT NULL
)
"#;

const CREATE_SLOW_QUERIES: &str = r#"
CREATE TABLE IF NOT EXISTS slow_queries (
    query VARCHAR(768) NOT NULL PRIMARY KEY,
    time_taken DOUBLE NOT NULL
)
"#;

const UPSERT_HITCOUNT: &str = r#"
INSERT INTO queries (query, hitcount)
VALUES (?, 1)
ON DUPLICATE KEY UPDATE hitcount = hitcount + 1
"#;

const UPSERT_SLOW_QUERY: &str = r#"
INSERT INTO slow_queries (query, time_taken)
VALUES (?, ?) AS new
ON DUPLICATE KEY UPDATE time_taken = GREATEST(slow_queries.time_taken, new.time_taken)
"#;

fn column_key(key: &CacheKey) -> Result<&str> {
    let len = key.as_str().chars().count();
    if len > MAX_QUERY_KEY_CHARS {
        return Err(ProxyError::Internal(format!(
            "query key is {} characters, the queries column holds {}",
            len, MAX_QUERY_KEY_CHARS
        )));
    }
    Ok(key.as_str())
}

pub struct MySqlStatsStore {
    pool: MySqlPool,
}

impl MySqlStatsStore {
    /// Open a pool and verify the server answers.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .database(&config.name);
        if !config.password.is_empty() {
            options = options.password(&config.password);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.ping().await?;

        info!(
            host = %config.host,
            port = config.port,
            database = %config.name,
            user = %config.user,
            "Connected to MySQL"
        );
        Ok(store)
    }
}

#[async_trait]
impl StatsStore for MySqlStatsStore {
    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_QUERIES).execute(&self.pool).await?;
        sqlx::query(CREATE_SLOW_QUERIES).execute(&self.pool).await?;
        Ok(())
    }

    async fn increment_hitcount(&self, key: &CacheKey) -> Result<()> {
        sqlx::query(UPSERT_HITCOUNT)
            .bind(column_key(key)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_slow_query(&self, key: &CacheKey, elapsed: Duration) -> Result<()> {
        sqlx::query(UPSERT_SLOW_QUERY)
            .bind(column_key(key)?)
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
        "mysql"
    }
}
