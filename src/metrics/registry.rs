// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec_with_registry, register_gauge_vec_with_registry,
    register_histogram_vec_with_registry, CounterVec, Encoder, GaugeVec, HistogramVec, Opts,
    Registry, TextEncoder,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // REQUEST METRICS
    // ============================================================================

    /// Intercepted requests by chosen strategy and where the response came from
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("gateway_requests_total", "Total intercepted requests"),
        &["strategy", "source"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // UPSTREAM METRICS
    // ============================================================================

    /// Upstream fetches by outcome
    pub static ref UPSTREAM_FETCHES: CounterVec = register_counter_vec_with_registry!(
        Opts::new("upstream_fetches_total", "Total upstream fetches"),
        &["outcome"], // outcome: success, http_error, failure
        REGISTRY
    ).unwrap();

    /// Upstream fetch duration
    pub static ref UPSTREAM_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("upstream_fetch_duration_seconds", "Upstream fetch duration")
            .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 1.5, 2.5, 5.0, 10.0]),
        &["outcome"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Cache operations
    pub static ref CACHE_OPERATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("cache_operations_total", "Total cache operations"),
        &["operation"], // operation: hit, miss, store, evict, store_error
        REGISTRY
    ).unwrap();

    /// Current cache entries
    pub static ref CACHE_ENTRIES: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("cache_entries_current", "Current number of cache entries"),
        &["store"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // LIFECYCLE METRICS
    // ============================================================================

    /// Install / activate / clear events
    pub static ref LIFECYCLE_EVENTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("gateway_lifecycle_events_total", "Gateway lifecycle events"),
        &["event", "status"],
        REGISTRY
    ).unwrap();
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // Vec metrics only show up once a label set has been touched
        REQUESTS_TOTAL.with_label_values(&["bypass", "bypass"]).inc();
        UPSTREAM_FETCHES.with_label_values(&["success"]).inc();
        CACHE_OPERATIONS.with_label_values(&["hit"]).inc();

        let metrics = gather_metrics();
        assert!(metrics.contains("gateway_requests_total"));
        assert!(metrics.contains("upstream_fetches_total"));
        assert!(metrics.contains("cache_operations_total"));
    }
}
