// nbrp - Read-through caching reverse proxy with query telemetry
// Author: kelexine (https://github.com/kelexine)

use anyhow::Result;
use clap::Parser;
use nbrp::cli::Args;
use nbrp::config::AppConfig;
use nbrp::server::{create_router, AppState};
use nbrp::upstream::UpstreamClient;
use nbrp::utils::logging;
use nbrp::{cache, stats};
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting nbrp v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Connect to both stores; either failing aborts startup
    let cache = cache::connect(&config.cache).await?;
    let stats = stats::connect(&config.database).await?;

    if args.check {
        info!(
            cache = cache.backend(),
            stats = stats.backend(),
            "Store connectivity check passed"
        );
        return Ok(());
    }

    // Phase 4: Build shared state and start background workers
    let upstream = UpstreamClient::new(&config.upstream)?;
    info!(
        upstream = %upstream.base_url(),
        prefix = %config.server.api_prefix,
        cache_expiration = ?config.cache.expiration,
        response_time_threshold = ?config.stats.response_time_threshold,
        "Proxy configured"
    );
    let state = AppState::new(config.clone(), cache, stats, upstream);

    // Phase 5: Build and start HTTP server
    let app = create_router(state.clone());
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 6: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Phase 7: Let queued cache writes and stats updates finish
    let drain = tokio::time::timeout(config.workers.drain_timeout, state.workers.settled()).await;
    if drain.is_err() {
        warn!(
            pending = state.workers.pending(),
            "Background work still pending at shutdown"
        );
    }

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
