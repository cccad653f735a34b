// Background job definitions
// Author: kelexine (https://github.com/kelexine)

use crate::cache::{CacheKey, CacheStore};
use crate::stats::StatsRecorder;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug)]
pub enum Job {
    /// Store an upstream body under its key with the configured TTL.
    PopulateCache { key: CacheKey, body: Bytes },
    /// Apply a completed request to the telemetry tables.
    RecordStats { key: CacheKey, elapsed: Duration },
}

impl Job {
    pub fn kind(&self) -> &'static str {
        match self {
            Job::PopulateCache { .. } => "populate_cache",
            Job::RecordStats { .. } => "record_stats",
        }
    }
}

/// Everything a worker needs to run a job.
pub struct JobContext {
    pub cache: Arc<dyn CacheStore>,
    pub cache_ttl: Duration,
    pub recorder: StatsRecorder,
}

impl JobContext {
    /// Run `job` to completion. Failures are logged here and reported as
    /// `false`; they never propagate.
    pub async fn run(&self, job: Job) -> bool {
        match job {
            Job::PopulateCache { key, body } => {
                match self.cache.set_with_ttl(&key, body, self.cache_ttl).await {
                    Ok(()) => {
                        crate::metrics::record_cache_store(true);
                        debug!(query = %key, "Cache populated");
                        true
                    }
                    Err(e) => {
                        crate::metrics::record_cache_store(false);
                        warn!(query = %key, "Failed to populate cache: {}", e);
                        false
                    }
                }
            }
            Job::RecordStats { key, elapsed } => self.recorder.record(&key, elapsed).await,
        }
    }
}
