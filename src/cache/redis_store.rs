// Redis-backed response cache
// Author: kelexine (https://github.com/kelexine)

use super::{CacheKey, CacheStore};
use crate::error::Result;
use crate::utils::logging::redact_url;
use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::info;

/// Cache store on a shared Redis instance.
///
/// `ConnectionManager` is cheaply cloneable and reconnects on its own; every
/// clone multiplexes over the same connection, so no extra locking is needed.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connect and PING. Fails when the server is unreachable so startup can
    /// abort instead of serving without a cache.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;

        let cache = Self { conn };
        cache.ping().await?;

        info!(url = %redact_url(url), "Connected to Redis");
        Ok(cache)
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key.as_str()).await?;
        Ok(value.map(Bytes::from))
    }

    async fn set_with_ttl(&self, key: &CacheKey, body: Bytes, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        // PX rejects 0, so sub-millisecond TTLs round up
        let millis = ttl.as_millis().max(1) as u64;
        redis::cmd("SET")
            .arg(key.as_str())
            .arg(&body[..])
            .arg("PX")
            .arg(millis)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
