//! The response cache gateway.
//!
//! A [`Gateway`] is one version of the caching layer, bound to one
//! version-qualified store name. It goes through the same lifecycle a
//! browser service worker does:
//!
//! - **install**: precache the app shell into the live store, all-or-nothing.
//! - **activate**: delete every store that is not the live one, then take
//!   over request handling.
//! - **handle**: classify each request and serve it with the matching strategy.
//!
//! The [`Registration`] hosts the active and waiting versions and delivers
//! control messages.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod classify;
mod control;
mod registration;
mod strategies;

pub use classify::{has_image_extension, Classifier, Strategy};
pub use control::{ControlMessage, ControlReply};
pub use registration::Registration;

use crate::cache::{enforce_limit, CacheStorage};
use crate::config::CacheConfig;
use crate::error::{GatewayError, Result};
use crate::metrics;
use crate::models::{CacheKey, GatewayRequest, GatewayResponse, ResponseSource};
use crate::upstream::Fetcher;
use crate::utils::logging::display_url;
use futures::future::{join_all, try_join_all};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strategies::StrategyContext;
use tracing::{debug, error, info, warn};

/// Lifecycle state of a gateway version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

/// One version of the caching layer.
pub struct Gateway {
    config: CacheConfig,
    classifier: Classifier,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    state: RwLock<GatewayState>,
    skip_waiting: AtomicBool,
}

impl Gateway {
    pub fn new(config: CacheConfig, storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>) -> Self {
        let classifier = Classifier::new(config.excluded_patterns.clone());
        Self {
            config,
            classifier,
            storage,
            fetcher,
            state: RwLock::new(GatewayState::Parsed),
            skip_waiting: AtomicBool::new(false),
        }
    }

    /// Name of the live store this version owns.
    pub fn cache_name(&self) -> &str {
        &self.config.name
    }

    pub fn state(&self) -> GatewayState {
        *self.state.read()
    }

    fn set_state(&self, state: GatewayState) {
        debug!("Gateway {} -> {:?}", self.config.name, state);
        *self.state.write() = state;
    }

    pub(crate) fn mark_redundant(&self) {
        self.set_state(GatewayState::Redundant);
    }

    /// Ask to replace the active version as soon as installation finishes.
    pub fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Open the live store and seed it with every precache asset.
    ///
    /// All assets are fetched before anything is written; a single failed
    /// fetch or unsuccessful status fails the install and the version becomes
    /// redundant.
    pub async fn install(&self) -> Result<usize> {
        self.set_state(GatewayState::Installing);
        info!(
            "Installing gateway {} ({} precache assets)",
            self.config.name,
            self.config.precache_assets.len()
        );

        match self.precache().await {
            Ok(count) => {
                self.set_state(GatewayState::Installed);
                metrics::record_lifecycle("install", true);
                info!("Installed gateway {}, precached {} assets", self.config.name, count);
                if self.config.skip_waiting_on_install {
                    self.skip_waiting();
                }
                Ok(count)
            }
            Err(e) => {
                self.set_state(GatewayState::Redundant);
                metrics::record_lifecycle("install", false);
                error!("Install of gateway {} failed: {}", self.config.name, e);
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<usize> {
        let store = self.storage.open(&self.config.name).await?;

        let fetches = self.config.precache_assets.iter().map(|path| async move {
            let request = GatewayRequest::get(path);
            let response = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(|e| GatewayError::Precache {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            if !response.is_success() {
                return Err(GatewayError::Precache {
                    path: path.clone(),
                    reason: format!("HTTP {}", response.status),
                });
            }
            Ok::<_, GatewayError>((CacheKey::for_request(&request), response))
        });
        let responses = try_join_all(fetches).await?;

        let count = responses.len();
        for (key, response) in responses {
            store.put(&key, response.to_record()).await?;
        }
        enforce_limit(store.as_ref(), self.config.limit).await?;
        Ok(count)
    }

    /// Delete every store except the live one, then take over handling.
    ///
    /// Deletions run concurrently and fail independently. Returns how many
    /// stale stores were removed.
    pub async fn activate(&self) -> usize {
        self.set_state(GatewayState::Activating);

        let names = match self.storage.store_names().await {
            Ok(names) => names,
            Err(e) => {
                warn!("Could not list cache stores during activation: {}", e);
                Vec::new()
            }
        };

        let deletions = names
            .iter()
            .filter(|name| name.as_str() != self.config.name)
            .map(|name| async move { (name, self.storage.delete_store(name).await) });

        let mut removed = 0;
        for (name, result) in join_all(deletions).await {
            match result {
                Ok(true) => {
                    info!("Deleted stale cache store {}", name);
                    removed += 1;
                }
                Ok(false) => {}
                Err(e) => warn!("Failed to delete stale cache store {}: {}", name, e),
            }
        }

        self.set_state(GatewayState::Activated);
        metrics::record_lifecycle("activate", true);
        info!("Gateway {} activated, claimed all clients", self.config.name);
        removed
    }

    /// Serve one intercepted request.
    ///
    /// Only a network-first request with no cache entry and a failing final
    /// fetch returns an error, and a bypassed request's fetch error passes
    /// through unchanged.
    pub async fn handle(&self, request: GatewayRequest) -> Result<GatewayResponse> {
        let strategy = self.classifier.classify(&request);
        debug!(
            "{} {} ({}) -> {}",
            request.method,
            display_url(request.path_and_query()),
            request.destination.as_str(),
            strategy
        );

        if strategy == Strategy::Bypass {
            let response = self.fetcher.fetch(&request).await?;
            metrics::record_request(strategy.as_str(), ResponseSource::Bypass.as_str());
            return Ok(response.with_source(ResponseSource::Bypass));
        }

        // whatever comes back may be stored for every client
        let request = request.without_conditionals();

        let store = match self.storage.open(&self.config.name).await {
            Ok(store) => store,
            Err(e) => {
                warn!("Live store {} unavailable, serving uncached: {}", self.config.name, e);
                return self.serve_uncached(strategy, &request).await;
            }
        };

        let ctx = StrategyContext {
            store,
            fetcher: self.fetcher.clone(),
            limit: self.config.limit,
            network_timeout: Duration::from_millis(self.config.network_timeout_ms),
        };

        let response = match strategy {
            Strategy::CacheFirstRefresh => ctx.cache_first_refresh(&request).await,
            Strategy::NetworkFirst => ctx.network_first(&request).await?,
            Strategy::StaleWhileRevalidate => ctx.stale_while_revalidate(&request).await,
            Strategy::Bypass => unreachable!("bypass handled above"),
        };

        metrics::record_request(strategy.as_str(), response.source.as_str());
        Ok(response)
    }

    /// Network only, with each strategy's own fallback when that fails too.
    async fn serve_uncached(&self, strategy: Strategy, request: &GatewayRequest) -> Result<GatewayResponse> {
        let response = match self.fetcher.fetch(request).await {
            Ok(response) => response.with_source(ResponseSource::Network),
            Err(e) => match strategy {
                Strategy::CacheFirstRefresh => GatewayResponse::not_found(),
                Strategy::StaleWhileRevalidate => GatewayResponse::offline(),
                _ => return Err(e),
            },
        };
        metrics::record_request(strategy.as_str(), response.source.as_str());
        Ok(response)
    }
}
