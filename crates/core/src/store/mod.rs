//! Plugin entity store - durable plugins and plugin versions.
//!
//! Versions belong to exactly one plugin and are removed with it. The store
//! enforces one plugin per upstream id and one version per
//! `(plugin, name, hash)`, so concurrent merges of the same upstream data
//! cannot produce duplicates.

mod sqlite;
mod types;

pub use sqlite::SqlitePluginStore;
pub use types::*;

/// Trait for plugin storage.
pub trait PluginStore: Send + Sync {
    /// Fold one upstream plugin (and its versions) into the store.
    ///
    /// Runs in a single transaction. Fields that are `None` in the upsert keep
    /// their stored value; `visible` is never touched.
    fn merge_upstream(&self, upsert: &PluginUpsert) -> Result<MergeOutcome, StoreError>;

    /// List plugins matching the filter, ordered by id, with their versions.
    fn list_plugins(&self, filter: &PluginFilter) -> Result<Vec<Plugin>, StoreError>;

    /// Get a plugin by local id.
    fn get_plugin(&self, id: i64) -> Result<Plugin, StoreError>;

    /// Find the plugin mirrored from the given upstream id.
    fn find_by_upstream_id(&self, upstream_id: i64) -> Result<Option<Plugin>, StoreError>;

    /// Create a locally curated plugin (hidden, no upstream id).
    fn create_plugin(&self, plugin: NewPlugin) -> Result<Plugin, StoreError>;

    /// Publish a new version under an existing plugin.
    fn publish_version(
        &self,
        plugin_id: i64,
        version: NewPluginVersion,
    ) -> Result<PluginVersion, StoreError>;

    /// Set the visibility flag of a plugin.
    fn set_visibility(&self, plugin_id: i64, visible: bool) -> Result<Plugin, StoreError>;

    /// List all versions of a plugin in insertion order.
    fn list_versions(&self, plugin_id: i64) -> Result<Vec<PluginVersion>, StoreError>;

    /// Increment the plugin-level and version-level counter of `kind` by one.
    ///
    /// Resolution is by display name; the first plugin with `plugin_name`
    /// (lowest id) wins. Both counters change together or not at all.
    fn increment_counters(
        &self,
        plugin_name: &str,
        version_name: &str,
        kind: CounterKind,
    ) -> Result<(), StoreError>;

    /// Delete a plugin and all of its versions.
    fn delete_plugin(&self, id: i64) -> Result<(), StoreError>;
}
