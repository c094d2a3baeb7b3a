// HTTP client for the upstream storefront origin
// Author: kelexine (https://github.com/kelexine)

use super::Fetcher;
use crate::config::UpstreamConfig;
use crate::error::{GatewayError, Result};
use crate::metrics;
use crate::models::{GatewayRequest, GatewayResponse};
use crate::utils::logging::display_url;
use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderName};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    header::HOST,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
    header::PROXY_AUTHORIZATION,
];

fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    for name in HOP_BY_HOP.iter() {
        out.remove(name);
    }
    out.remove("keep-alive");
    out.remove("proxy-connection");
    out
}

/// Fetches requests from the configured upstream origin.
pub struct HttpFetcher {
    http_client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with a pooled, keep-alive HTTP client.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let base = url::Url::parse(&config.base_url)
            .map_err(|e| GatewayError::Config(format!("Invalid upstream URL: {}", e)))?;

        let timeout = Duration::from_secs(config.timeout_seconds);
        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .tcp_nodelay(true)
            .redirect(reqwest::redirect::Policy::none())
            .use_rustls_tls()
            .build()
            .map_err(|e| GatewayError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created upstream HTTP client for {}", base);

        Ok(Self {
            http_client,
            base_url: base.as_str().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn target_url(&self, request: &GatewayRequest) -> String {
        format!("{}{}", self.base_url, request.path_and_query())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &GatewayRequest) -> Result<GatewayResponse> {
        let url = self.target_url(request);
        let started = Instant::now();

        let sent = self
            .http_client
            .request(request.method.clone(), &url)
            .headers(strip_hop_by_hop(&request.headers))
            .body(request.body.clone())
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                metrics::record_upstream("failure", started.elapsed().as_secs_f64());
                warn!("Upstream fetch failed for {} {}: {}", request.method, display_url(&url), e);
                if e.is_timeout() {
                    return Err(GatewayError::Timeout(self.timeout.as_millis() as u64));
                }
                return Err(GatewayError::Upstream(format!(
                    "{} {}: {}",
                    request.method,
                    display_url(&url),
                    e
                )));
            }
        };

        let status = response.status();
        let headers = strip_hop_by_hop(response.headers());
        let body = response.bytes().await.map_err(|e| {
            metrics::record_upstream("failure", started.elapsed().as_secs_f64());
            GatewayError::Upstream(format!("reading body of {}: {}", display_url(&url), e))
        })?;

        let outcome = if status.as_u16() < 400 { "success" } else { "http_error" };
        metrics::record_upstream(outcome, started.elapsed().as_secs_f64());
        debug!(
            "Upstream {} {} -> {} ({} bytes, {:?})",
            request.method,
            display_url(&url),
            status,
            body.len(),
            started.elapsed()
        );

        Ok(GatewayResponse::new(status, headers, body))
    }
}
