// HTTP middleware
// Author: kelexine (https://github.com/kelexine)

use super::routes::AppState;
use crate::cache::CacheKey;
use crate::worker::Job;
use axum::extract::{OriginalUri, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Create request ID layers for the application
pub fn request_id_layers() -> (SetRequestIdLayer<MakeRequestUuid>, PropagateRequestIdLayer) {
    (
        SetRequestIdLayer::x_request_id(MakeRequestUuid),
        PropagateRequestIdLayer::x_request_id(),
    )
}

/// Times the wrapped handler and, for HTTP 200 responses only, queues a
/// telemetry update for the request key. The response is returned without
/// waiting for the update.
pub async fn record_stats(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let uri = req
        .extensions()
        .get::<OriginalUri>()
        .map(|original| original.0.clone())
        .unwrap_or_else(|| req.uri().clone());

    let start = Instant::now();
    let response = next.run(req).await;
    let elapsed = start.elapsed();

    let status = response.status();
    crate::metrics::record_request(status.as_u16(), elapsed.as_secs_f64());

    if status == StatusCode::OK {
        let key = CacheKey::from_uri(&state.config.server.api_prefix, &uri);
        state.workers.submit(Job::RecordStats { key, elapsed });
    }

    response
}
