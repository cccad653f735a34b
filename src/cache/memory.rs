// In-process response cache
// Author: kelexine (https://github.com/kelexine)

use super::{CacheKey, CacheStore};
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

struct MemoryEntry {
    body: Bytes,
    expires_at: Instant,
}

/// Process-local cache: bounded LRU, entries expire lazily on lookup.
///
/// Not shared between instances; intended for single-node deployments and
/// tests.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key.as_str()) {
            Some(entry) if entry.expires_at > Instant::now() => return Ok(Some(entry.body.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key.as_str());
        }
        Ok(None)
    }

    async fn set_with_ttl(&self, key: &CacheKey, body: Bytes, ttl: Duration) -> Result<()> {
        let entry = MemoryEntry {
            body,
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().put(key.as_str().to_string(), entry);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> CacheKey {
        CacheKey::new(s, Some("x=1"))
    }

    #[tokio::test]
    async fn test_get_after_set() {
        let cache = MemoryCache::new(8);
        cache
            .set_with_ttl(&key("/route"), Bytes::from_static(b"abc"), Duration::from_secs(60))
            .await
            .unwrap();

        let body = cache.get(&key("/route")).await.unwrap();
        assert_eq!(body.as_deref(), Some(&b"abc"[..]));
        assert!(cache.get(&key("/other")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let cache = MemoryCache::new(8);
        cache
            .set_with_ttl(&key("/route"), Bytes::from_static(b"abc"), Duration::from_millis(30))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cache.get(&key("/route")).await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let cache = MemoryCache::new(8);
        let ttl = Duration::from_secs(60);
        cache.set_with_ttl(&key("/route"), Bytes::from_static(b"first"), ttl).await.unwrap();
        cache.set_with_ttl(&key("/route"), Bytes::from_static(b"second"), ttl).await.unwrap();

        let body = cache.get(&key("/route")).await.unwrap();
        assert_eq!(body.as_deref(), Some(&b"second"[..]));
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let cache = MemoryCache::new(2);
        let ttl = Duration::from_secs(60);
        cache.set_with_ttl(&key("/a"), Bytes::from_static(b"a"), ttl).await.unwrap();
        cache.set_with_ttl(&key("/b"), Bytes::from_static(b"b"), ttl).await.unwrap();
        cache.get(&key("/a")).await.unwrap();
        cache.set_with_ttl(&key("/c"), Bytes::from_static(b"c"), ttl).await.unwrap();

        assert!(cache.get(&key("/a")).await.unwrap().is_some());
        assert!(cache.get(&key("/b")).await.unwrap().is_none());
        assert_eq!(cache.len(), 2);
    }
}
