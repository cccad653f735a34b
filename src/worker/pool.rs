// Fixed-size worker pool over a bounded queue
// Author: kelexine (https://github.com/kelexine)

use super::{Job, JobContext};
use crate::metrics::BACKGROUND_PENDING;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{error, info, warn};

struct PoolState {
    /// Jobs accepted and not yet finished.
    pending: AtomicUsize,
    dropped: AtomicU64,
    idle: Notify,
}

// The pending counter and the exported gauge always move together, and both
// go up before the job can reach a worker.
impl PoolState {
    fn job_accepted(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        BACKGROUND_PENDING.inc();
    }

    fn job_finished(&self) {
        BACKGROUND_PENDING.dec();
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Handle to the background workers. Cheap to clone; all clones feed the
/// same queue.
#[derive(Clone)]
pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
    state: Arc<PoolState>,
}

impl WorkerPool {
    /// Start `workers` tasks draining a queue of `queue_capacity` jobs.
    /// Must be called inside a Tokio runtime.
    pub fn spawn(workers: usize, queue_capacity: usize, context: JobContext) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let context = Arc::new(context);
        let state = Arc::new(PoolState {
            pending: AtomicUsize::new(0),
            dropped: AtomicU64::new(0),
            idle: Notify::new(),
        });

        for _ in 0..workers.max(1) {
            tokio::spawn(worker_loop(
                Arc::clone(&receiver),
                Arc::clone(&context),
                Arc::clone(&state),
            ));
        }

        info!(workers, queue_capacity, "Background worker pool started");

        Self { sender, state }
    }

    /// Queue `job` without waiting. Returns `false` when the job was dropped
    /// because the queue is full or the workers are gone.
    pub fn submit(&self, job: Job) -> bool {
        let kind = job.kind();
        self.state.job_accepted();

        match self.sender.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.state.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                self.state.job_finished();
                crate::metrics::record_job(kind, "dropped");
                warn!(kind, dropped_total = dropped, "Background queue full, dropping job");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                let dropped = self.state.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                self.state.job_finished();
                crate::metrics::record_job(kind, "dropped");
                error!(kind, dropped_total = dropped, "Background queue closed, dropping job");
                false
            }
        }
    }

    /// Jobs dropped since startup.
    pub fn dropped(&self) -> u64 {
        self.state.dropped.load(Ordering::Relaxed)
    }

    /// Jobs queued or running.
    pub fn pending(&self) -> usize {
        self.state.pending.load(Ordering::Acquire)
    }

    /// Wait until every accepted job has finished.
    pub async fn settled(&self) {
        loop {
            let idle = self.state.idle.notified();
            if self.pending() == 0 {
                return;
            }
            idle.await;
        }
    }
}

async fn worker_loop(
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    context: Arc<JobContext>,
    state: Arc<PoolState>,
) {
    loop {
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        let kind = job.kind();
        let ok = context.run(job).await;
        crate::metrics::record_job(kind, if ok { "completed" } else { "failed" });
        state.job_finished();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKey, CacheStore, MemoryCache};
    use crate::error::Result;
    use crate::stats::{SqliteStatsStore, StatsRecorder, StatsStore};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    fn context(cache: Arc<dyn CacheStore>, stats: Arc<dyn StatsStore>) -> JobContext {
        JobContext {
            cache,
            cache_ttl: Duration::from_secs(60),
            recorder: StatsRecorder::new(stats, Duration::from_secs(1)),
        }
    }

    fn key(s: &str) -> CacheKey {
        CacheKey::new(s, None)
    }

    #[tokio::test]
    async fn test_jobs_run_and_settle() {
        let cache = Arc::new(MemoryCache::new(16));
        let stats = Arc::new(SqliteStatsStore::in_memory().await.unwrap());
        let pool = WorkerPool::spawn(2, 16, context(cache.clone(), stats.clone()));

        assert!(pool.submit(Job::PopulateCache { key: key("/a"), body: Bytes::from_static(b"abc") }));
        assert!(pool.submit(Job::RecordStats { key: key("/a"), elapsed: Duration::from_millis(10) }));
        assert!(pool.submit(Job::RecordStats { key: key("/a"), elapsed: Duration::from_millis(10) }));
        pool.settled().await;

        assert_eq!(pool.pending(), 0);
        assert_eq!(cache.get(&key("/a")).await.unwrap().as_deref(), Some(&b"abc"[..]));
        assert_eq!(stats.hitcounts().await.unwrap()[0].hitcount, 2);
    }

    #[tokio::test]
    async fn test_settled_returns_immediately_when_idle() {
        let cache = Arc::new(MemoryCache::new(16));
        let stats = Arc::new(SqliteStatsStore::in_memory().await.unwrap());
        let pool = WorkerPool::spawn(1, 4, context(cache, stats));

        tokio::time::timeout(Duration::from_secs(1), pool.settled())
            .await
            .unwrap();
    }

    /// Cache whose writes wait for a permit, to hold a worker busy.
    struct GatedCache {
        gate: Semaphore,
        started: Notify,
        inner: MemoryCache,
    }

    #[async_trait]
    impl CacheStore for GatedCache {
        async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>> {
            self.inner.get(key).await
        }
        async fn set_with_ttl(&self, key: &CacheKey, body: Bytes, ttl: Duration) -> Result<()> {
            self.started.notify_one();
            let _permit = self.gate.acquire().await.unwrap();
            self.inner.set_with_ttl(key, body, ttl).await
        }
        async fn ping(&self) -> Result<()> {
            Ok(())
        }
        fn backend(&self) -> &'static str {
            "gated"
        }
    }

    #[tokio::test]
    async fn test_full_queue_drops_and_counts() {
        let cache = Arc::new(GatedCache {
            gate: Semaphore::new(0),
            started: Notify::new(),
            inner: MemoryCache::new(16),
        });
        let stats = Arc::new(SqliteStatsStore::in_memory().await.unwrap());
        let pool = WorkerPool::spawn(1, 1, context(cache.clone(), stats));

        // First job occupies the only worker
        assert!(pool.submit(Job::PopulateCache { key: key("/a"), body: Bytes::from_static(b"a") }));
        cache.started.notified().await;

        // Second fills the queue, third has nowhere to go
        assert!(pool.submit(Job::PopulateCache { key: key("/b"), body: Bytes::from_static(b"b") }));
        assert!(!pool.submit(Job::PopulateCache { key: key("/c"), body: Bytes::from_static(b"c") }));
        assert_eq!(pool.dropped(), 1);
        // The dropped job gives its slot back; the running and queued ones keep theirs
        assert_eq!(pool.pending(), 2);

        cache.gate.add_permits(10);
        pool.settled().await;

        assert!(cache.get(&key("/a")).await.unwrap().is_some());
        assert!(cache.get(&key("/b")).await.unwrap().is_some());
        assert!(cache.get(&key("/c")).await.unwrap().is_none());
    }
}
