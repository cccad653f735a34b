//! Axum-based HTTP server for the nbrp proxy.
//!
//! # Components
//!
//! - `handlers`: The proxy, stats, health and metrics endpoints.
//! - `middleware`: Request IDs and the telemetry timing layer.
//! - `routes`: Shared state and the router that ties everything together.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod handlers;
mod middleware;
mod routes;

pub use handlers::{HealthCheck, HealthResponse, HealthStatus};
pub use routes::{create_router, AppState};
