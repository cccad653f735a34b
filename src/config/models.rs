//! Configuration data structures for the nbrp proxy.
//!
//! This module defines the schema for the application settings: the HTTP
//! listener, the upstream API, the response cache, the telemetry database,
//! background workers and logging.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::utils::duration::serde_str;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings (host, port, API prefix).
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream API settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Response cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Telemetry database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Query telemetry settings.
    #[serde(default)]
    pub stats: StatsConfig,

    /// Background worker pool settings.
    #[serde(default)]
    pub workers: WorkerConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `0.0.0.0`
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on (`APP_PORT`).
    /// Default: `8080`
    #[serde(default = "default_port")]
    pub port: u16,

    /// Versioned prefix under which the proxy and stats routes live.
    /// Default: `/api/v1`
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

/// Settings for the proxied upstream API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL the forwarded path and query string are appended to.
    #[serde(default = "default_upstream_base_url")]
    pub base_url: String,

    /// Optional request timeout in seconds. No timeout when unset.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

/// Settings for the response cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// `redis` (shared) or `memory` (process-local LRU).
    /// Default: `redis`
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackend,

    /// TTL applied to every cache write (`CACHE_EXPIRATION`).
    /// Default: `300s`
    #[serde(default = "default_cache_expiration", with = "serde_str")]
    pub expiration: Duration,

    /// Whether upstream bodies with a non-2xx status are cached too.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub cache_error_responses: bool,

    /// Entry capacity of the `memory` backend.
    /// Default: `10000`
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,

    /// Redis host (`REDIS_HOST`). Default: `localhost`
    #[serde(default = "default_localhost")]
    pub redis_host: String,

    /// Redis port (`REDIS_PORT`). Default: `6379`
    #[serde(default = "default_redis_port")]
    pub redis_port: u16,

    /// Redis password (`REDIS_PASSWORD`). Empty means no AUTH.
    #[serde(default)]
    pub redis_password: String,

    /// Redis logical database index. Default: `0`
    #[serde(default)]
    pub redis_db: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    Mysql,
    Sqlite,
}

/// Settings for the relational telemetry store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `mysql` or `sqlite`. Default: `mysql`
    #[serde(default = "default_database_driver")]
    pub driver: DatabaseDriver,

    /// MySQL host (`DB_HOST`). Default: `localhost`
    #[serde(default = "default_localhost")]
    pub host: String,

    /// MySQL port (`DB_PORT`). Default: `3306`
    #[serde(default = "default_database_port")]
    pub port: u16,

    /// MySQL user (`DB_USER`). Default: `root`
    #[serde(default = "default_database_user")]
    pub user: String,

    /// MySQL password (`DB_PASSWORD`). Default: empty
    #[serde(default)]
    pub password: String,

    /// MySQL database name (`DB_NAME`). Default: `nbrp`
    #[serde(default = "default_database_name")]
    pub name: String,

    /// Database file for the `sqlite` driver; `:memory:` is accepted.
    /// Default: `nbrp.db`
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,

    /// Maximum pooled connections. Default: `10`
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Create the `queries` and `slow_queries` tables at startup if missing.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub create_schema: bool,
}

/// Settings for query telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Latency above which a request counts as a slow query
    /// (`RESPONSE_TIME_THRESHOLD`). Default: `1s`
    #[serde(default = "default_response_time_threshold", with = "serde_str")]
    pub response_time_threshold: Duration,
}

/// Settings for the background worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of worker tasks draining the job queue.
    /// Default: number of logical CPU cores.
    #[serde(default = "default_worker_count")]
    pub count: usize,

    /// Jobs that may wait in the queue before new ones are dropped.
    /// Default: `1024`
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How long shutdown waits for queued jobs to finish.
    /// Default: `5s`
    #[serde(default = "default_drain_timeout", with = "serde_str")]
    pub drain_timeout: Duration,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`, `compact`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default trait implementations linking to custom logic

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_prefix: default_api_prefix(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_base_url(),
            timeout_seconds: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            expiration: default_cache_expiration(),
            cache_error_responses: true,
            memory_capacity: default_memory_capacity(),
            redis_host: default_localhost(),
            redis_port: default_redis_port(),
            redis_password: String::new(),
            redis_db: 0,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: default_database_driver(),
            host: default_localhost(),
            port: default_database_port(),
            user: default_database_user(),
            password: String::new(),
            name: default_database_name(),
            sqlite_path: default_sqlite_path(),
            max_connections: default_max_connections(),
            create_schema: true,
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            response_time_threshold: default_response_time_threshold(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            drain_timeout: default_drain_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl CacheConfig {
    /// Connection URL for the Redis backend. Contains the password, so log
    /// it only through `utils::logging::redact_url`.
    pub fn redis_url(&self) -> String {
        if self.redis_password.is_empty() {
            format!("redis://{}:{}/{}", self.redis_host, self.redis_port, self.redis_db)
        } else {
            format!(
                "redis://:{}@{}:{}/{}",
                self.redis_password, self.redis_host, self.redis_port, self.redis_db
            )
        }
    }
}

// Helper functions for serde defaults and shared constants
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_upstream_base_url() -> String {
    "http://webservices.nextbus.com/service/publicXMLFeed".to_string()
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::Redis
}

fn default_cache_expiration() -> Duration {
    Duration::from_secs(300)
}

fn default_memory_capacity() -> usize {
    10_000
}

fn default_localhost() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_database_driver() -> DatabaseDriver {
    DatabaseDriver::Mysql
}

fn default_database_port() -> u16 {
    3306
}

fn default_database_user() -> String {
    "root".to_string()
}

fn default_database_name() -> String {
    "nbrp".to_string()
}

fn default_sqlite_path() -> String {
    "nbrp.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_response_time_threshold() -> Duration {
    Duration::from_secs(1)
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_drain_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
