// Upstream HTTP client
// Author: kelexine (https://github.com/kelexine)

use crate::cache::CacheKey;
use crate::config::UpstreamConfig;
use crate::error::{ProxyError, Result};
use bytes::Bytes;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Status and raw body of an upstream reply.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Client for the single upstream API the proxy fronts.
///
/// Issues plain GETs to `base_url` followed by the request key. No retries;
/// no timeout unless one is configured.
pub struct UpstreamClient {
    http_client: Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .tcp_nodelay(true)
            .use_rustls_tls();
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let http_client = builder
            .build()
            .map_err(|e| ProxyError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created upstream HTTP client for {}", config.base_url);

        Ok(Self {
            http_client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full upstream URL for `key`: the base URL with the key appended verbatim.
    pub fn url_for(&self, key: &CacheKey) -> String {
        format!("{}{}", self.base_url, key.as_str())
    }

    /// GET the upstream resource for `key`.
    ///
    /// Any status code is a successful fetch; only failing to send the
    /// request or to read the whole body is an error.
    pub async fn fetch(&self, key: &CacheKey) -> Result<UpstreamResponse> {
        let url = self.url_for(key);
        let start = Instant::now();

        let result = self.send(&url).await;

        let elapsed = start.elapsed().as_secs_f64();
        match &result {
            Ok(resp) => {
                crate::metrics::record_upstream_call(Some(resp.status), elapsed);
                debug!(url = %url, status = resp.status, bytes = resp.body.len(), "Upstream responded");
            }
            Err(e) => {
                crate::metrics::record_upstream_call(None, elapsed);
                warn!(url = %url, "Upstream fetch failed: {}", e);
            }
        }

        result
    }

    async fn send(&self, url: &str) -> Result<UpstreamResponse> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(UpstreamResponse { status, body })
    }
}
