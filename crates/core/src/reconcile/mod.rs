//! Reconciliation of the upstream catalog into the plugin store.
//!
//! Each upstream entry is merged in its own store transaction. Entries
//! without a numeric id, or that are not objects, are skipped; any other
//! wrongly typed field is treated as absent. The rest of the snapshot is
//! still applied. Locally owned fields (`visible`) are never
//! written, and running the same snapshot twice leaves the store unchanged
//! apart from the upstream-supplied counters.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::store::{PluginStore, PluginUpsert, StoreError, VersionUpsert};
use crate::timestamp::parse_optional;
use crate::upstream::{CatalogSource, UpstreamError, UpstreamPlugin, UpstreamSnapshot};

/// Errors that abort a reconciliation run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Upstream catalog unavailable: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Store error during reconciliation: {0}")]
    Store(#[from] StoreError),
}

/// Summary of one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries in the snapshot.
    pub entries: usize,
    pub plugins_created: usize,
    pub plugins_updated: usize,
    pub versions_created: usize,
    pub versions_updated: usize,
    /// Entries without an upstream id or that failed to decode.
    pub skipped: usize,
    /// Versions missing a name or hash.
    pub versions_skipped: usize,
}

/// Runs reconciliation passes against a catalog source and a store.
#[derive(Clone)]
pub struct Reconciler {
    source: Arc<dyn CatalogSource>,
    store: Arc<dyn PluginStore>,
}

impl Reconciler {
    pub fn new(source: Arc<dyn CatalogSource>, store: Arc<dyn PluginStore>) -> Self {
        Self { source, store }
    }

    /// Fetch the snapshot and fold it into the store.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let start = Instant::now();

        let result = match self.source.fetch().await {
            Ok(snapshot) => reconcile(&snapshot, self.store.as_ref()),
            Err(e) => Err(SyncError::Upstream(e)),
        };

        let label = if result.is_ok() { "success" } else { "failed" };
        metrics::SYNC_RUNS.with_label_values(&[label]).inc();
        metrics::SYNC_DURATION
            .with_label_values(&[label])
            .observe(start.elapsed().as_secs_f64());

        match &result {
            Ok(report) => debug!(
                entries = report.entries,
                created = report.plugins_created,
                updated = report.plugins_updated,
                skipped = report.skipped,
                duration_ms = start.elapsed().as_millis() as u64,
                "Reconciliation finished"
            ),
            Err(e) => warn!(error = %e, "Reconciliation failed"),
        }

        result
    }
}

/// Fold a snapshot into the store.
///
/// A store error aborts the run; entries merged before it stay committed.
pub fn reconcile(
    snapshot: &UpstreamSnapshot,
    store: &dyn PluginStore,
) -> Result<SyncReport, SyncError> {
    let mut report = SyncReport {
        entries: snapshot.len(),
        ..Default::default()
    };

    for (index, entry) in snapshot.plugins().enumerate() {
        let plugin = match entry {
            Ok(plugin) => plugin,
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed upstream entry");
                record_skip(&mut report);
                continue;
            }
        };

        let Some(upsert) = to_upsert(plugin, &mut report) else {
            debug!(index, "Skipping upstream entry without id");
            record_skip(&mut report);
            continue;
        };

        let outcome = store.merge_upstream(&upsert)?;

        if outcome.plugin_created {
            report.plugins_created += 1;
            metrics::SYNC_ENTRIES.with_label_values(&["created"]).inc();
        } else {
            report.plugins_updated += 1;
            metrics::SYNC_ENTRIES.with_label_values(&["updated"]).inc();
        }
        report.versions_created += outcome.versions_created as usize;
        report.versions_updated += outcome.versions_updated as usize;
    }

    if report.plugins_created > 0 || report.skipped > 0 {
        info!(
            entries = report.entries,
            plugins_created = report.plugins_created,
            versions_created = report.versions_created,
            skipped = report.skipped,
            versions_skipped = report.versions_skipped,
            "Reconciled upstream catalog"
        );
    }

    Ok(report)
}

fn record_skip(report: &mut SyncReport) {
    report.skipped += 1;
    metrics::SYNC_ENTRIES.with_label_values(&["skipped"]).inc();
}

/// Convert an upstream entry into a store upsert; `None` without an id.
fn to_upsert(plugin: UpstreamPlugin, report: &mut SyncReport) -> Option<PluginUpsert> {
    let upstream_id = plugin.id?;

    let mut versions = Vec::new();
    for version in plugin.versions.unwrap_or_default() {
        let (Some(name), Some(hash)) = (version.name, version.hash) else {
            report.versions_skipped += 1;
            continue;
        };

        versions.push(VersionUpsert {
            name,
            hash,
            artifact: version.artifact,
            created: parse_optional(version.created.as_deref()),
            downloads: version.downloads,
            updates: version.updates,
        });
    }

    Some(PluginUpsert {
        upstream_id,
        name: plugin.name,
        author: plugin.author,
        description: plugin.description,
        tags: plugin.tags,
        image_url: plugin.image_url,
        downloads: plugin.downloads,
        updates: plugin.updates,
        created: parse_optional(plugin.created.as_deref()),
        updated: parse_optional(plugin.updated.as_deref()),
        versions,
    })
}
