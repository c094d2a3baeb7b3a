// Registration: hosts gateway versions and routes requests to the active one
// Author: kelexine (https://github.com/kelexine)

use super::{ControlMessage, ControlReply, Gateway, GatewayState};
use crate::cache::CacheStorage;
use crate::error::Result;
use crate::metrics;
use crate::models::{GatewayRequest, GatewayResponse, ResponseSource};
use crate::upstream::Fetcher;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Holds at most one active and one waiting gateway.
///
/// A freshly installed gateway takes over right away when it asked to skip
/// waiting or when nothing is active yet. Otherwise it waits until a
/// `SKIP_WAITING` message promotes it.
pub struct Registration {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    active: RwLock<Option<Arc<Gateway>>>,
    waiting: Mutex<Option<Arc<Gateway>>>,
}

impl Registration {
    pub fn new(storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            storage,
            fetcher,
            active: RwLock::new(None),
            waiting: Mutex::new(None),
        }
    }

    pub fn active(&self) -> Option<Arc<Gateway>> {
        self.active.read().clone()
    }

    pub fn waiting(&self) -> Option<Arc<Gateway>> {
        self.waiting.lock().clone()
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    /// Install `gateway` and activate it or park it as waiting.
    ///
    /// A failed install leaves the current active gateway in charge.
    pub async fn register(&self, gateway: Gateway) -> Result<Arc<Gateway>> {
        let gateway = Arc::new(gateway);
        gateway.install().await?;

        let nothing_active = self.active.read().is_none();
        if gateway.skip_waiting_requested() || nothing_active {
            self.promote(gateway.clone()).await;
        } else {
            info!("Gateway {} installed and waiting", gateway.cache_name());
            let replaced = self.waiting.lock().replace(gateway.clone());
            if let Some(previous) = replaced {
                previous.mark_redundant();
            }
        }
        Ok(gateway)
    }

    async fn promote(&self, gateway: Arc<Gateway>) {
        gateway.activate().await;
        let previous = self.active.write().replace(gateway);
        if let Some(previous) = previous {
            debug!("Gateway {} retired", previous.cache_name());
            previous.mark_redundant();
        }
    }

    /// Route a request to the active gateway, or straight to the network
    /// when none is active.
    pub async fn handle(&self, request: GatewayRequest) -> Result<GatewayResponse> {
        match self.active() {
            Some(gateway) => gateway.handle(request).await,
            None => {
                let response = self.fetcher.fetch(&request).await?;
                Ok(response.with_source(ResponseSource::Bypass))
            }
        }
    }

    /// Deliver a control message. `reply`, when given, receives the confirmation
    /// for messages that have one.
    pub async fn post_message(&self, message: ControlMessage, reply: Option<oneshot::Sender<ControlReply>>) {
        match message {
            ControlMessage::SkipWaiting => {
                let waiting = self.waiting.lock().take();
                match waiting {
                    Some(gateway) if gateway.state() == GatewayState::Installed => {
                        gateway.skip_waiting();
                        info!("Skip waiting: activating gateway {}", gateway.cache_name());
                        self.promote(gateway).await;
                    }
                    Some(gateway) => {
                        debug!("Waiting gateway {} is {:?}, ignoring", gateway.cache_name(), gateway.state());
                    }
                    None => debug!("Skip waiting with no waiting gateway"),
                }
            }
            ControlMessage::ClearCache => {
                let removed = self.clear_all_stores().await;
                info!("Cleared {} cache stores", removed);
                if let Some(reply) = reply {
                    if reply.send(ControlReply::CacheCleared).is_err() {
                        debug!("Clear-cache reply channel closed before confirmation");
                    }
                }
            }
        }
    }

    /// Delete every store, live one included. Each deletion fails on its own.
    async fn clear_all_stores(&self) -> usize {
        let names = match self.storage.store_names().await {
            Ok(names) => names,
            Err(e) => {
                warn!("Could not list cache stores to clear: {}", e);
                metrics::record_lifecycle("clear", false);
                return 0;
            }
        };

        let deletions = names
            .iter()
            .map(|name| async move { (name, self.storage.delete_store(name).await) });

        let mut removed = 0;
        let mut failed = false;
        for (name, result) in join_all(deletions).await {
            match result {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    failed = true;
                    warn!("Failed to delete cache store {}: {}", name, e);
                }
            }
        }
        metrics::record_lifecycle("clear", !failed);
        removed
    }
}
