//! Response cache stores.
//!
//! The proxy talks to its cache only through [`CacheStore`]: a lookup that
//! distinguishes "absent" from "failed", and a write with a TTL. Two
//! backends are provided:
//!
//! - `redis`: the shared store used in production.
//! - `memory`: a process-local LRU with lazy TTL expiry.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod key;
pub mod memory;
pub mod redis_store;

pub use self::key::CacheKey;
pub use self::memory::MemoryCache;
pub use self::redis_store::RedisCache;

use crate::config::{CacheBackend, CacheConfig};
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Cached body for `key`, `None` when absent or expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>>;

    /// Store `body` under `key`, replacing any previous value.
    async fn set_with_ttl(&self, key: &CacheKey, body: Bytes, ttl: Duration) -> Result<()>;

    /// Round-trip to the store; used for startup and health checks.
    async fn ping(&self) -> Result<()>;

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}

/// Open the configured cache backend. Fails when Redis is unreachable.
pub async fn connect(config: &CacheConfig) -> Result<Arc<dyn CacheStore>> {
    match config.backend {
        CacheBackend::Redis => Ok(Arc::new(RedisCache::connect(&config.redis_url()).await?)),
        CacheBackend::Memory => {
            info!(capacity = config.memory_capacity, "Using in-process response cache");
            Ok(Arc::new(MemoryCache::new(config.memory_capacity)))
        }
    }
}
