// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{control_handler, health_handler, metrics_handler, proxy_handler};
use super::middleware::{access_log, request_id_layers};
use crate::config::AppConfig;
use crate::gateway::Registration;
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub registration: Arc<Registration>,
}

pub fn create_router(config: AppConfig, registration: Arc<Registration>) -> Router {
    let body_limit = config.server.max_body_bytes;
    let state = AppState {
        config,
        registration,
    };

    let (set_request_id, propagate_request_id) = request_id_layers();

    Router::new()
        .route("/__gateway/health", get(health_handler))
        .route("/__gateway/metrics", get(metrics_handler))
        .route("/__gateway/control", post(control_handler))
        .fallback(proxy_handler)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(from_fn(access_log))
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(state)
}
