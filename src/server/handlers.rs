// HTTP request handlers
// Author: kelexine (https://github.com/kelexine)

use super::routes::AppState;
use crate::cache::CacheKey;
use crate::error::Result;
use crate::stats::StatsReport;
use crate::worker::Job;
use axum::{
    extract::{OriginalUri, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HashMap<String, HealthCheck>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: String,
}

fn text_response(status: StatusCode, body: Bytes) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

/// Cache-aside GET proxy for everything under the API prefix.
///
/// A hit is answered from the cache with 200. A miss (or a failed lookup)
/// goes upstream; the upstream status and body are returned as-is and the
/// body is queued for caching. Transport failures become a plain 500 and
/// leave the cache untouched.
pub async fn proxy_handler(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Result<Response> {
    let key = CacheKey::from_uri(&state.config.server.api_prefix, &uri);

    match state.cache.get(&key).await {
        Ok(Some(body)) => {
            crate::metrics::record_cache_hit();
            debug!(query = %key, "Cache hit");
            return Ok(text_response(StatusCode::OK, body));
        }
        Ok(None) => {
            crate::metrics::record_cache_miss();
            debug!(query = %key, "Cache miss");
        }
        Err(e) => {
            crate::metrics::record_cache_lookup_error();
            warn!(query = %key, "Cache lookup failed, fetching upstream: {}", e);
        }
    }

    let upstream = state.upstream.fetch(&key).await?;
    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);

    if status.is_success() || state.config.cache.cache_error_responses {
        state.workers.submit(Job::PopulateCache {
            key,
            body: upstream.body.clone(),
        });
    }

    Ok(text_response(status, upstream.body))
}

/// The proxy is GET-only; HEAD must not reach upstream or the telemetry.
pub async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET")]).into_response()
}

/// Hit counts and slow queries, read fresh from the stats store.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Response> {
    let report = StatsReport::collect(
        state.stats.as_ref(),
        state.config.stats.response_time_threshold,
    )
    .await?;

    pretty_json(&report)
}

// One-space indentation, matching what existing consumers of /stats parse
fn pretty_json<T: Serialize>(value: &T) -> Result<Response> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        buffer,
    )
        .into_response())
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut checks = HashMap::new();
    let mut failures = 0;

    let cache_check = match state.cache.ping().await {
        Ok(()) => HealthCheck {
            status: "ok".to_string(),
            message: format!("{} reachable", state.cache.backend()),
        },
        Err(e) => {
            failures += 1;
            HealthCheck {
                status: "error".to_string(),
                message: e.to_string(),
            }
        }
    };
    checks.insert("cache".to_string(), cache_check);

    let stats_check = match state.stats.ping().await {
        Ok(()) => HealthCheck {
            status: "ok".to_string(),
            message: format!("{} reachable", state.stats.backend()),
        },
        Err(e) => {
            failures += 1;
            HealthCheck {
                status: "error".to_string(),
                message: e.to_string(),
            }
        }
    };
    checks.insert("stats_store".to_string(), stats_check);

    let dropped = state.workers.dropped();
    let workers_check = HealthCheck {
        status: if dropped == 0 { "ok" } else { "warning" }.to_string(),
        message: format!(
            "{} jobs pending, {} dropped since startup",
            state.workers.pending(),
            dropped
        ),
    };
    checks.insert("background_workers".to_string(), workers_check);

    let status = match failures {
        0 => HealthStatus::Healthy,
        1 => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    };

    Json(HealthResponse {
        status,
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn metrics_handler() -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
        .into_response()
}
