//! Types for the plugin entity store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A plugin row together with its versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    /// Local identifier.
    pub id: i64,
    /// Identifier in the upstream feed; `None` for locally curated plugins.
    pub upstream_id: Option<i64>,
    pub name: String,
    pub author: Option<String>,
    pub description: Option<String>,
    /// Ordered tags (persisted as a JSON text blob).
    pub tags: Vec<String>,
    /// Locally owned; only the curation API changes it.
    pub visible: bool,
    pub image_url: Option<String>,
    pub downloads: i64,
    pub updates: i64,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    /// Versions in insertion order (ascending id).
    pub versions: Vec<PluginVersion>,
}

/// A published version of a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginVersion {
    pub id: i64,
    pub plugin_id: i64,
    pub name: String,
    pub hash: String,
    /// URL or path of the downloadable payload.
    pub artifact: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub downloads: i64,
    pub updates: i64,
}

/// A plugin created through the curation API.
#[derive(Debug, Clone, Default)]
pub struct NewPlugin {
    pub name: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
}

/// A version published through the curation API.
#[derive(Debug, Clone, Default)]
pub struct NewPluginVersion {
    pub name: String,
    pub hash: String,
    pub artifact: Option<String>,
    /// Defaults to now when `None`.
    pub created: Option<DateTime<Utc>>,
}

/// Upstream data for one plugin, ready to be merged.
///
/// Every `None` means "upstream has no opinion": on an existing row the
/// column keeps its value, on a new row the column gets its default.
#[derive(Debug, Clone, Default)]
pub struct PluginUpsert {
    pub upstream_id: i64,
    pub name: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub downloads: Option<i64>,
    pub updates: Option<i64>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub versions: Vec<VersionUpsert>,
}

/// Upstream data for one version, keyed by `(name, hash)`.
#[derive(Debug, Clone, Default)]
pub struct VersionUpsert {
    pub name: String,
    pub hash: String,
    pub artifact: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub downloads: Option<i64>,
    pub updates: Option<i64>,
}

/// What a single merge did to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub plugin_id: i64,
    /// True when the plugin row was inserted rather than updated.
    pub plugin_created: bool,
    pub versions_created: u32,
    pub versions_updated: u32,
}

/// Filter for plugin scans.
#[derive(Debug, Clone, Default)]
pub struct PluginFilter {
    /// Only plugins with `visible = true`.
    pub visible_only: bool,
    /// Case-insensitive substring matched against name or description.
    pub search: Option<String>,
}

impl PluginFilter {
    /// The public catalog view.
    pub fn visible() -> Self {
        Self {
            visible_only: true,
            search: None,
        }
    }

    /// The administrative view (everything).
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.is_empty() { None } else { Some(search) };
        self
    }
}

/// Which counter pair an increment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterKind {
    Download,
    Update,
}

impl CounterKind {
    pub fn from_is_update(is_update: bool) -> Self {
        if is_update {
            CounterKind::Update
        } else {
            CounterKind::Download
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CounterKind::Download => "download",
            CounterKind::Update => "update",
        }
    }

    /// Column name on both `plugins` and `plugin_versions`.
    pub(crate) fn column(&self) -> &'static str {
        match self {
            CounterKind::Download => "downloads",
            CounterKind::Update => "updates",
        }
    }
}

/// Errors for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    #[error("Plugin version not found: {plugin} {version}")]
    VersionNotFound { plugin: String, version: String },

    #[error("Conflict: {0}")]
    Conflict(String),
}
