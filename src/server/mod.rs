//! Axum-based HTTP server for the cachegate proxy.
//!
//! Every request the page sends lands here. Requests under `/__gateway/` are
//! the proxy's own endpoints; everything else falls through to the active
//! gateway, which decides whether to answer from cache or from upstream.
//!
//! # Components
//!
//! - `handlers`: the proxy fallback plus health, metrics and control endpoints.
//! - `middleware`: request IDs, body limits and the sanitized access log.
//! - `routes`: the router configuration that ties everything together.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod handlers;
mod middleware;
mod routes;

pub use handlers::ControlRequest;
pub use routes::{create_router, AppState};
