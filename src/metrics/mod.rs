// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics,
    REQUESTS_TOTAL,
    UPSTREAM_FETCHES,
    UPSTREAM_DURATION,
    CACHE_OPERATIONS,
    CACHE_ENTRIES,
    LIFECYCLE_EVENTS,
};

/// Helper to record a handled request
pub fn record_request(strategy: &str, source: &str) {
    REQUESTS_TOTAL.with_label_values(&[strategy, source]).inc();
}

/// Helper to record an upstream fetch
pub fn record_upstream(outcome: &str, duration_secs: f64) {
    UPSTREAM_FETCHES.with_label_values(&[outcome]).inc();
    UPSTREAM_DURATION
        .with_label_values(&[outcome])
        .observe(duration_secs);
}

/// Helpers to record cache operations
pub fn record_cache_hit() {
    CACHE_OPERATIONS.with_label_values(&["hit"]).inc();
}

pub fn record_cache_miss() {
    CACHE_OPERATIONS.with_label_values(&["miss"]).inc();
}

pub fn record_cache_store() {
    CACHE_OPERATIONS.with_label_values(&["store"]).inc();
}

pub fn record_cache_store_error() {
    CACHE_OPERATIONS.with_label_values(&["store_error"]).inc();
}

pub fn record_cache_eviction() {
    CACHE_OPERATIONS.with_label_values(&["evict"]).inc();
}

pub fn update_cache_entries(store: &str, count: usize) {
    CACHE_ENTRIES.with_label_values(&[store]).set(count as f64);
}

/// Helper to record install / activate / clear outcomes
pub fn record_lifecycle(event: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    LIFECYCLE_EVENTS.with_label_values(&[event, status]).inc();
}
