// Upstream fetch module
// Author: kelexine (https://github.com/kelexine)

mod client;

pub use client::HttpFetcher;

use crate::error::Result;
use crate::models::{GatewayRequest, GatewayResponse};
use async_trait::async_trait;

/// The network primitive the gateway sits in front of.
///
/// A transport failure is an `Err`; any HTTP status, including 4xx/5xx, is an `Ok`
/// response. Callers decide what counts as cacheable.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &GatewayRequest) -> Result<GatewayResponse>;
}
