// Error types for the nbrp proxy
// Author: kelexine (https://github.com/kelexine)

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Body returned to clients when the upstream cannot be reached.
pub const PROXY_FAILURE_MESSAGE: &str = "Unable to proxy this request :'(";

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Stats store error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Upstream transport error: {0}")]
    Upstream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        ProxyError::Upstream(err.to_string())
    }
}

// Convert ProxyError to HTTP responses for Axum
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        // Upstream failures keep the fixed plain-text body clients already rely on
        if let ProxyError::Upstream(_) = self {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                PROXY_FAILURE_MESSAGE,
            )
                .into_response();
        }

        let error_type = match self {
            ProxyError::Config(_) | ProxyError::ConfigParsing(_) | ProxyError::InvalidDuration(_) => {
                "configuration_error"
            }
            ProxyError::Redis(_) => "cache_error",
            ProxyError::Database(_) => "stats_store_error",
            _ => "internal_error",
        };

        let body = json!({
            "type": "error",
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        });

        (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
