//! Mock catalog source for testing.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::upstream::{CatalogSource, UpstreamError, UpstreamPlugin, UpstreamSnapshot};

/// Mock implementation of the CatalogSource trait.
///
/// Provides controllable behavior for testing:
/// - Serve a configurable snapshot (typed entries or raw JSON)
/// - Count fetches for assertions
/// - Simulate upstream failures
///
/// # Example
///
/// ```rust,ignore
/// use plugin_store_core::testing::{MockCatalogSource, fixtures};
///
/// let source = MockCatalogSource::new();
/// source.add_plugin(fixtures::upstream_plugin(7, "Foo", &[("1.0.0", "abc")])).await;
///
/// let snapshot = source.fetch().await?;
/// assert_eq!(snapshot.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockCatalogSource {
    /// Raw entries served as the snapshot.
    entries: Arc<RwLock<Vec<Value>>>,
    /// Number of fetch calls.
    fetches: Arc<AtomicUsize>,
    /// If set, the next fetch will fail with this error.
    next_error: Arc<RwLock<Option<UpstreamError>>>,
    /// If set, every fetch fails with a 503 until cleared.
    unavailable: Arc<RwLock<bool>>,
}

impl Default for MockCatalogSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalogSource {
    /// Create a mock serving an empty catalog.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            fetches: Arc::new(AtomicUsize::new(0)),
            next_error: Arc::new(RwLock::new(None)),
            unavailable: Arc::new(RwLock::new(false)),
        }
    }

    // =========================================================================
    // Snapshot Configuration
    // =========================================================================

    /// Append a plugin entry.
    pub async fn add_plugin(&self, plugin: UpstreamPlugin) {
        if let Ok(value) = serde_json::to_value(&plugin) {
            self.entries.write().await.push(value);
        }
    }

    /// Replace the snapshot with the given entries.
    pub async fn set_plugins(&self, plugins: Vec<UpstreamPlugin>) {
        let values = plugins
            .iter()
            .filter_map(|plugin| serde_json::to_value(plugin).ok())
            .collect();
        *self.entries.write().await = values;
    }

    /// Append an arbitrary JSON entry (for malformed-input tests).
    pub async fn add_raw(&self, entry: Value) {
        self.entries.write().await.push(entry);
    }

    /// Clear all entries.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    // =========================================================================
    // Fetch Recording
    // =========================================================================

    /// Number of fetches performed.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Error Injection
    // =========================================================================

    /// Configure the next fetch to fail with the given error.
    pub async fn set_next_error(&self, error: UpstreamError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every fetch fail until cleared.
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }
}

#[async_trait]
impl CatalogSource for MockCatalogSource {
    async fn fetch(&self) -> Result<UpstreamSnapshot, UpstreamError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        if *self.unavailable.read().await {
            return Err(UpstreamError::Status {
                status: 503,
                message: "mock upstream unavailable".to_string(),
            });
        }

        Ok(UpstreamSnapshot::from_entries(
            self.entries.read().await.clone(),
        ))
    }
}
