// HTTP middleware
// Author: kelexine (https://github.com/kelexine)

use crate::utils::logging::display_url;
use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::info;

/// Header carrying where the response came from (`hit`, `miss`, `bypass`, `synthetic`).
pub const CACHE_STATUS_HEADER: &str = "x-cache";

/// Create request ID layers for the application
pub fn request_id_layers() -> (SetRequestIdLayer<MakeRequestUuid>, PropagateRequestIdLayer) {
    (
        SetRequestIdLayer::x_request_id(MakeRequestUuid),
        PropagateRequestIdLayer::x_request_id(),
    )
}

/// One log line per request, with credentials stripped from the URL.
pub async fn access_log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let cache = response
        .headers()
        .get(CACHE_STATUS_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    info!(
        request_id = %request_id,
        cache = %cache,
        "{} {} -> {} in {:?}",
        method,
        display_url(&uri),
        response.status().as_u16(),
        started.elapsed()
    );

    response
}
