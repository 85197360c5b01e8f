//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the plugin store server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Curation authentication failures
//! - Catalog size (collected dynamically)
//!
//! Core metrics (reconciliation, upstream fetches, counters) are registered
//! into the same registry.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use plugin_store_core::PluginFilter;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "plugin_store_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("plugin_store_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "plugin_store_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures on curation endpoints.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "plugin_store_auth_failures_total",
            "Total authentication failures",
        ),
        &["reason"], // "not_authenticated", "invalid_credentials", "not_configured"
    )
    .unwrap()
});

// =============================================================================
// Catalog Metrics (collected dynamically)
// =============================================================================

/// Plugins in the store by visibility.
pub static PLUGINS_BY_VISIBILITY: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("plugin_store_plugins", "Plugins in the store"),
        &["visibility"], // "visible", "hidden"
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // Catalog
    registry
        .register(Box::new(PLUGINS_BY_VISIBILITY.clone()))
        .unwrap();

    // Core metrics (reconciliation, upstream, counters)
    for metric in plugin_store_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// Reads the store directly; no reconciliation is triggered.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    if let Ok(plugins) = state.store().list_plugins(&PluginFilter::all()) {
        let visible = plugins.iter().filter(|p| p.visible).count() as i64;
        PLUGINS_BY_VISIBILITY
            .with_label_values(&["visible"])
            .set(visible);
        PLUGINS_BY_VISIBILITY
            .with_label_values(&["hidden"])
            .set(plugins.len() as i64 - visible);
    }
}

static NUMERIC_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

static COUNTER_PATH: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"^/plugins/[^/]+/versions/[^/]+/increment$").unwrap());

/// Normalize a path for metric labels (replace ids and names with placeholders).
pub fn normalize_path(path: &str) -> String {
    // Plugin and version names are free text; collapse them first
    if COUNTER_PATH.is_match(path) {
        return "/plugins/{name}/versions/{version}/increment".to_string();
    }

    // Run twice so adjacent numeric segments both get replaced
    let result = NUMERIC_SEGMENT.replace_all(path, "/{id}$1");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}
