//! Bounded background work.
//!
//! Cache population after a miss and telemetry updates after a response
//! both run off the request path. They go through a fixed pool of worker
//! tasks fed by a bounded queue: when the queue is full the job is dropped,
//! counted and logged instead of piling up unbounded tasks and store
//! connections.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod job;
mod pool;

pub use job::{Job, JobContext};
pub use pool::WorkerPool;
