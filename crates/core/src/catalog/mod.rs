//! Catalog query service.
//!
//! Every listing runs a reconciliation pass first, so clients always see the
//! store as of the latest snapshot. An unavailable upstream fails the query;
//! nothing is served from stale local state in that case.

mod types;

pub use types::*;

use std::sync::Arc;

use thiserror::Error;

use crate::reconcile::{Reconciler, SyncError};
use crate::store::{PluginFilter, PluginStore, StoreError};

/// Errors from catalog queries.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Serves the public, visibility-gated plugin catalog.
#[derive(Clone)]
pub struct CatalogService {
    reconciler: Reconciler,
    store: Arc<dyn PluginStore>,
}

impl CatalogService {
    pub fn new(reconciler: Reconciler, store: Arc<dyn PluginStore>) -> Self {
        Self { reconciler, store }
    }

    /// List visible plugins, optionally filtered by a case-insensitive
    /// substring of name or description. Ordered by local id.
    pub async fn list_plugins(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<PluginListing>, CatalogError> {
        self.reconciler.run().await?;

        let filter = match search {
            Some(term) => PluginFilter::visible().with_search(term),
            None => PluginFilter::visible(),
        };

        let plugins = self.store.list_plugins(&filter)?;
        Ok(plugins.iter().map(PluginListing::from).collect())
    }
}
