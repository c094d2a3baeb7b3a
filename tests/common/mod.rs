// Shared test doubles
// Author: kelexine (https://github.com/kelexine)

#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use cachegate::cache::{CacheStorage, CacheStore, MemoryStorage};
use cachegate::config::CacheConfig;
use cachegate::error::{GatewayError, Result};
use cachegate::models::{CacheKey, GatewayRequest, GatewayResponse, ResponseRecord};
use cachegate::upstream::Fetcher;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// What the scripted upstream does for one fetch.
#[derive(Debug, Clone)]
pub enum Reply {
    Respond(u16, &'static str),
    /// Like `Respond`, with extra response headers.
    WithHeaders(u16, &'static str, Vec<(&'static str, &'static str)>),
    Delayed(Duration, u16, &'static str),
    Fail,
    Hang,
}

/// Upstream stand-in answering per path. Each path has a queue of replies;
/// the last one repeats once the queue is down to it.
#[derive(Default)]
pub struct ScriptedFetcher {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, path: &str, replies: Vec<Reply>) -> Self {
        self.set(path, replies);
        self
    }

    pub fn set(&self, path: &str, replies: Vec<Reply>) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), replies.into());
    }

    pub fn calls(&self, path: &str) -> usize {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    fn next_reply(&self, path: &str) -> Option<Reply> {
        *self.calls.lock().unwrap().entry(path.to_string()).or_default() += 1;
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(path)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

fn respond(status: u16, body: &'static str) -> GatewayResponse {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    GatewayResponse::new(
        StatusCode::from_u16(status).unwrap(),
        headers,
        Bytes::from_static(body.as_bytes()),
    )
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &GatewayRequest) -> Result<GatewayResponse> {
        let path = request.path_and_query().to_string();
        match self.next_reply(&path) {
            Some(Reply::Respond(status, body)) => Ok(respond(status, body)),
            Some(Reply::WithHeaders(status, body, extra)) => {
                let mut response = respond(status, body);
                for (name, value) in extra {
                    response.headers.append(
                        axum::http::HeaderName::from_static(name),
                        HeaderValue::from_static(value),
                    );
                }
                Ok(response)
            }
            Some(Reply::Delayed(delay, status, body)) => {
                tokio::time::sleep(delay).await;
                Ok(respond(status, body))
            }
            Some(Reply::Fail) => Err(GatewayError::Upstream(format!("scripted failure for {}", path))),
            Some(Reply::Hang) => std::future::pending().await,
            None => Err(GatewayError::Upstream(format!("no route for {}", path))),
        }
    }
}

/// Storage whose deletion of one named store always fails.
pub struct FlakyStorage {
    pub inner: MemoryStorage,
    pub undeletable: String,
}

#[async_trait]
impl CacheStorage for FlakyStorage {
    async fn open(&self, name: &str) -> Result<std::sync::Arc<dyn CacheStore>> {
        self.inner.open(name).await
    }

    async fn store_names(&self) -> Result<Vec<String>> {
        self.inner.store_names().await
    }

    async fn delete_store(&self, name: &str) -> Result<bool> {
        if name == self.undeletable {
            return Err(GatewayError::Storage(format!("{} is locked", name)));
        }
        self.inner.delete_store(name).await
    }
}

pub const LIVE: &str = "regala-algo-cache-v1";

/// Shipped policy with a short race timer so timeout tests stay fast.
pub fn cache_config(name: &str) -> CacheConfig {
    CacheConfig {
        name: name.to_string(),
        network_timeout_ms: 50,
        ..CacheConfig::default()
    }
}

/// Fetcher that serves the default precache list.
pub fn shell_fetcher() -> ScriptedFetcher {
    ScriptedFetcher::new()
        .on("/", vec![Reply::Respond(200, "<html>shell</html>")])
        .on("/index.html", vec![Reply::Respond(200, "<html>shell</html>")])
}

pub fn key(path: &str) -> CacheKey {
    CacheKey::for_request(&GatewayRequest::get(path))
}

pub fn record(body: &'static str) -> ResponseRecord {
    respond(200, body).to_record()
}

/// Poll until `key` in `store` holds `body`, for background refresh tests.
pub async fn wait_for_body(store: &dyn CacheStore, key: &CacheKey, body: &str) -> bool {
    for _ in 0..100 {
        if let Ok(Some(record)) = store.lookup(key).await {
            if record.body == body.as_bytes() {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
