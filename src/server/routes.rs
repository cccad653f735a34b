// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{
    health_handler, method_not_allowed, metrics_handler, proxy_handler, stats_handler,
};
use super::middleware::{record_stats, request_id_layers};
use crate::cache::CacheStore;
use crate::config::AppConfig;
use crate::stats::{StatsRecorder, StatsStore};
use crate::upstream::UpstreamClient;
use crate::worker::{JobContext, WorkerPool};
use axum::{middleware::from_fn_with_state, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared request context, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache: Arc<dyn CacheStore>,
    pub stats: Arc<dyn StatsStore>,
    pub upstream: Arc<UpstreamClient>,
    pub workers: WorkerPool,
}

impl AppState {
    /// Wire the stores together and start the background workers.
    /// Must be called inside a Tokio runtime.
    pub fn new(
        config: AppConfig,
        cache: Arc<dyn CacheStore>,
        stats: Arc<dyn StatsStore>,
        upstream: UpstreamClient,
    ) -> Self {
        let recorder = StatsRecorder::new(stats.clone(), config.stats.response_time_threshold);
        let workers = WorkerPool::spawn(
            config.workers.count,
            config.workers.queue_capacity,
            JobContext {
                cache: cache.clone(),
                cache_ttl: config.cache.expiration,
                recorder,
            },
        );

        Self {
            config: Arc::new(config),
            cache,
            stats,
            upstream: Arc::new(upstream),
            workers,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let prefix = state.config.server.api_prefix.clone();
    let (set_request_id, propagate_request_id) = request_id_layers();

    // Only proxied requests are instrumented; reading stats never writes them.
    // GET routes answer HEAD too unless it has its own handler.
    let proxy = Router::new()
        .route(&prefix, get(proxy_handler).head(method_not_allowed))
        .route(&format!("{}/", prefix), get(proxy_handler).head(method_not_allowed))
        .route(&format!("{}/*path", prefix), get(proxy_handler).head(method_not_allowed))
        .route_layer(from_fn_with_state(state.clone(), record_stats));

    Router::new()
        .route(&format!("{}/stats", prefix), get(stats_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(proxy)
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(state)
}
