// Cache strategies
// Author: kelexine (https://github.com/kelexine)

use crate::cache::{enforce_limit, CacheStore};
use crate::error::Result;
use crate::metrics;
use crate::models::{CacheKey, GatewayRequest, GatewayResponse, ResponseSource};
use crate::upstream::Fetcher;
use crate::utils::logging::display_url;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Everything a strategy needs for one request. Cheap to clone into
/// background refresh tasks.
#[derive(Clone)]
pub(crate) struct StrategyContext {
    pub store: Arc<dyn CacheStore>,
    pub fetcher: Arc<dyn Fetcher>,
    pub limit: usize,
    pub network_timeout: Duration,
}

impl StrategyContext {
    /// Storage failures read as a miss.
    async fn lookup(&self, key: &CacheKey) -> Option<GatewayResponse> {
        match self.store.lookup(key).await {
            Ok(Some(record)) => {
                metrics::record_cache_hit();
                Some(GatewayResponse::from_record(record))
            }
            Ok(None) => {
                metrics::record_cache_miss();
                None
            }
            Err(e) => {
                warn!("Cache lookup failed for {}: {}", display_url(key.as_str()), e);
                metrics::record_cache_miss();
                None
            }
        }
    }

    /// Store a cacheable response, then restore the size bound.
    async fn store_response(&self, key: &CacheKey, response: &GatewayResponse) {
        if let Err(e) = self.store.put(key, response.to_record()).await {
            warn!("Cache write failed for {}: {}", display_url(key.as_str()), e);
            metrics::record_cache_store_error();
            return;
        }
        metrics::record_cache_store();

        if let Err(e) = enforce_limit(self.store.as_ref(), self.limit).await {
            warn!("Eviction failed for store {}: {}", self.store.name(), e);
        }
    }

    /// Fetch in a detached task, storing the response if it is cacheable.
    /// A network failure resolves to `None` and never reaches the caller.
    fn spawn_refresh(&self, request: &GatewayRequest, key: CacheKey) -> JoinHandle<Option<GatewayResponse>> {
        let ctx = self.clone();
        let request = request.clone();

        tokio::spawn(async move {
            match ctx.fetcher.fetch(&request).await {
                Ok(response) => {
                    if response.is_cacheable() {
                        ctx.store_response(&key, &response).await;
                    }
                    Some(response.with_source(ResponseSource::Network))
                }
                Err(e) => {
                    debug!("Background refresh of {} failed: {}", display_url(key.as_str()), e);
                    None
                }
            }
        })
    }

    /// Cached copy immediately when present; the refresh lands for later requests.
    /// With nothing cached, the network result or a synthetic 404.
    pub async fn cache_first_refresh(&self, request: &GatewayRequest) -> GatewayResponse {
        let key = CacheKey::for_request(request);
        let cached = self.lookup(&key).await;
        let refresh = self.spawn_refresh(request, key);

        if let Some(cached) = cached {
            return cached;
        }

        match refresh.await {
            Ok(Some(response)) => response,
            Ok(None) => GatewayResponse::not_found(),
            Err(e) => {
                warn!("Refresh task for {} aborted: {}", display_url(request.path_and_query()), e);
                GatewayResponse::not_found()
            }
        }
    }

    /// Network within the timeout wins, even when unsuccessful. Otherwise cache,
    /// otherwise one last fetch without a timer whose error is returned as-is.
    pub async fn network_first(&self, request: &GatewayRequest) -> Result<GatewayResponse> {
        let key = CacheKey::for_request(request);

        match tokio::time::timeout(self.network_timeout, self.fetcher.fetch(request)).await {
            Ok(Ok(response)) => {
                if response.is_cacheable() {
                    self.store_response(&key, &response).await;
                }
                return Ok(response.with_source(ResponseSource::Network));
            }
            Ok(Err(e)) => {
                debug!("Network failed for {}, trying cache: {}", display_url(key.as_str()), e);
            }
            Err(_) => {
                debug!(
                    "Network slower than {:?} for {}, trying cache",
                    self.network_timeout,
                    display_url(key.as_str())
                );
            }
        }

        if let Some(cached) = self.lookup(&key).await {
            return Ok(cached);
        }

        let response = self.fetcher.fetch(request).await?;
        Ok(response.with_source(ResponseSource::Network))
    }

    /// Cached copy immediately when present, revalidated in the background.
    /// With nothing cached, the network result or a synthetic 503.
    pub async fn stale_while_revalidate(&self, request: &GatewayRequest) -> GatewayResponse {
        let key = CacheKey::for_request(request);
        let cached = self.lookup(&key).await;
        let revalidate = self.spawn_refresh(request, key);

        if let Some(cached) = cached {
            return cached;
        }

        match revalidate.await {
            Ok(Some(response)) => response,
            Ok(None) => GatewayResponse::offline(),
            Err(e) => {
                warn!("Revalidate task for {} aborted: {}", display_url(request.path_and_query()), e);
                GatewayResponse::offline()
            }
        }
    }
}
