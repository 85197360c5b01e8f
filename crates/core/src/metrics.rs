//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Reconciliation (runs, merged entries, duration)
//! - Upstream catalog fetches (remote vs cache)
//! - Usage counter increments

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Reconciliation Metrics
// =============================================================================

/// Reconciliation runs by result.
pub static SYNC_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("plugin_store_sync_runs_total", "Total reconciliation runs"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Upstream entries processed by outcome.
pub static SYNC_ENTRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "plugin_store_sync_entries_total",
            "Upstream plugin entries processed during reconciliation",
        ),
        &["outcome"], // "created", "updated", "skipped"
    )
    .unwrap()
});

/// Reconciliation duration in seconds.
pub static SYNC_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "plugin_store_sync_duration_seconds",
            "Duration of a reconciliation run",
        )
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 15.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Upstream Metrics
// =============================================================================

/// Upstream catalog fetches by source.
pub static UPSTREAM_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "plugin_store_upstream_fetch_total",
            "Upstream catalog fetches",
        ),
        &["source"], // "remote", "cache", "failed"
    )
    .unwrap()
});

// =============================================================================
// Counter Metrics
// =============================================================================

/// Usage counter increments by kind.
pub static COUNTER_INCREMENTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "plugin_store_counter_increments_total",
            "Usage counter increment requests",
        ),
        &["kind", "result"], // kind: "download", "update"; result: "ok", "not_found", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Reconciliation
        Box::new(SYNC_RUNS.clone()),
        Box::new(SYNC_ENTRIES.clone()),
        Box::new(SYNC_DURATION.clone()),
        // Upstream
        Box::new(UPSTREAM_FETCHES.clone()),
        // Counters
        Box::new(COUNTER_INCREMENTS.clone()),
    ]
}
