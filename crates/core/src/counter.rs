//! Usage counter mutations.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::metrics;
use crate::store::{CounterKind, PluginStore, StoreError};

/// Records downloads and updates reported by clients.
#[derive(Clone)]
pub struct CounterService {
    store: Arc<dyn PluginStore>,
}

impl CounterService {
    pub fn new(store: Arc<dyn PluginStore>) -> Self {
        Self { store }
    }

    /// Bump the plugin and version counters of `kind` by one.
    ///
    /// Unknown plugin or version names yield a not-found error and change
    /// nothing.
    pub fn increment(
        &self,
        plugin_name: &str,
        version_name: &str,
        kind: CounterKind,
    ) -> Result<(), StoreError> {
        let result = self
            .store
            .increment_counters(plugin_name, version_name, kind);

        let label = match &result {
            Ok(()) => "ok",
            Err(StoreError::PluginNotFound(_)) | Err(StoreError::VersionNotFound { .. }) => {
                "not_found"
            }
            Err(_) => "error",
        };
        metrics::COUNTER_INCREMENTS
            .with_label_values(&[kind.as_str(), label])
            .inc();

        match &result {
            Ok(()) => debug!(
                plugin = plugin_name,
                version = version_name,
                kind = kind.as_str(),
                "Incremented counters"
            ),
            Err(StoreError::Database(e)) => warn!(
                plugin = plugin_name,
                version = version_name,
                error = %e,
                "Counter increment failed"
            ),
            Err(_) => {}
        }

        result
    }
}
