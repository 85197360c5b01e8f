//! Testing utilities and mock implementations.
//!
//! This module provides a mock upstream catalog plus fixtures, allowing the
//! reconciliation and serving paths to be exercised without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use plugin_store_core::testing::{fixtures, MockCatalogSource};
//!
//! let source = MockCatalogSource::new();
//! source.add_plugin(fixtures::upstream_plugin(7, "Foo", &[("1.0.0", "abc")])).await;
//!
//! // Use in a Reconciler or AppState...
//! ```

mod mock_catalog_source;

pub use mock_catalog_source::MockCatalogSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::store::{NewPlugin, NewPluginVersion};
    use crate::upstream::{UpstreamPlugin, UpstreamVersion};

    /// An upstream version with only its natural key set.
    pub fn upstream_version(name: &str, hash: &str) -> UpstreamVersion {
        UpstreamVersion {
            name: Some(name.to_string()),
            hash: Some(hash.to_string()),
            ..Default::default()
        }
    }

    /// An upstream plugin with reasonable defaults and the given versions.
    pub fn upstream_plugin(id: i64, name: &str, versions: &[(&str, &str)]) -> UpstreamPlugin {
        UpstreamPlugin {
            id: Some(id),
            name: Some(name.to_string()),
            author: Some("Test Author".to_string()),
            description: Some(format!("{} plugin", name)),
            tags: Some(vec!["test".to_string()]),
            image_url: Some(format!("https://cdn.example.com/{}.png", id)),
            downloads: Some(0),
            updates: Some(0),
            created: Some("2025-10-15T22:29:47Z".to_string()),
            updated: Some("2025-10-15T22:29:47Z".to_string()),
            versions: Some(
                versions
                    .iter()
                    .map(|(name, hash)| upstream_version(name, hash))
                    .collect(),
            ),
        }
    }

    /// A curated plugin creation request.
    pub fn new_plugin(name: &str) -> NewPlugin {
        NewPlugin {
            name: name.to_string(),
            author: Some("Curator".to_string()),
            description: Some(format!("{} (curated)", name)),
            tags: vec!["curated".to_string()],
            image_url: None,
        }
    }

    /// A version publication request with `created` left to default.
    pub fn new_version(name: &str, hash: &str) -> NewPluginVersion {
        NewPluginVersion {
            name: name.to_string(),
            hash: hash.to_string(),
            artifact: Some(format!("https://cdn.example.com/{}.zip", hash)),
            created: None,
        }
    }
}
