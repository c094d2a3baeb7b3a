// HTTP request handlers
// Author: kelexine (https://github.com/kelexine)

use super::middleware::CACHE_STATUS_HEADER;
use super::routes::AppState;
use crate::error::GatewayError;
use crate::gateway::{ControlMessage, Gateway, GatewayState};
use crate::metrics::gather_metrics;
use crate::models::{GatewayRequest, GatewayResponse};
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Serialize)]
pub struct GatewayInfo {
    pub cache_name: String,
    pub state: GatewayState,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub active: Option<GatewayInfo>,
    pub waiting: Option<GatewayInfo>,
    pub cache_entries: Option<usize>,
    pub store_names: Vec<String>,
    pub timestamp: String,
}

fn info(gateway: &Gateway) -> GatewayInfo {
    GatewayInfo {
        cache_name: gateway.cache_name().to_string(),
        state: gateway.state(),
    }
}

/// Degraded means no gateway is active and every request passes straight through.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let registration = &state.registration;
    let active = registration.active();
    let storage = registration.storage();

    let cache_entries = match &active {
        Some(gateway) => match storage.open(gateway.cache_name()).await {
            Ok(store) => store.keys().await.ok().map(|keys| keys.len()),
            Err(_) => None,
        },
        None => None,
    };
    let store_names = storage.store_names().await.unwrap_or_default();

    Json(HealthResponse {
        status: if active.is_some() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        },
        active: active.as_deref().map(info),
        waiting: registration.waiting().as_deref().map(info),
        cache_entries,
        store_names,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}

/// Body of `POST /__gateway/control`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlRequest {
    #[serde(rename = "type")]
    pub message: ControlMessage,
    /// Whether the caller wants a confirmation in the response body.
    #[serde(default)]
    pub reply: bool,
}

/// The HTTP response doubles as the reply channel.
pub async fn control_handler(
    State(state): State<AppState>,
    Json(req): Json<ControlRequest>,
) -> Response {
    debug!("Control message {:?} (reply: {})", req.message, req.reply);

    if !req.reply {
        state.registration.post_message(req.message, None).await;
        return StatusCode::ACCEPTED.into_response();
    }

    let (tx, rx) = oneshot::channel();
    state.registration.post_message(req.message, Some(tx)).await;
    match rx.await {
        Ok(reply) => Json(reply).into_response(),
        // message has no confirmation
        Err(_) => StatusCode::ACCEPTED.into_response(),
    }
}

/// Every non-gateway request: buffer it, hand it to the registration, and
/// turn the result back into an HTTP response.
pub async fn proxy_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, GatewayError> {
    let (parts, body) = request.into_parts();

    let uri: Uri = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .parse()
        .map_err(|e| GatewayError::InvalidRequest(format!("Bad request target: {}", e)))?;

    let body = axum::body::to_bytes(body, state.config.server.max_body_bytes)
        .await
        .map_err(|e| GatewayError::InvalidRequest(format!("Failed to read request body: {}", e)))?;

    let request = GatewayRequest::new(parts.method, uri, parts.headers, body);
    let response = state.registration.handle(request).await?;
    Ok(into_http_response(response))
}

fn into_http_response(response: GatewayResponse) -> Response {
    let source = response.source;
    let mut http = Response::new(Body::from(response.body));
    *http.status_mut() = response.status;
    *http.headers_mut() = response.headers;
    http.headers_mut().insert(
        CACHE_STATUS_HEADER,
        HeaderValue::from_static(source.as_str()),
    );
    http
}
