//! Public projection of catalog entries.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::{Plugin, PluginVersion};
use crate::timestamp::serialize_optional;

/// A plugin as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginListing {
    /// Upstream id when the plugin is mirrored, local id otherwise.
    pub id: i64,
    pub name: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub visible: bool,
    pub downloads: i64,
    pub updates: i64,
    #[serde(serialize_with = "serialize_optional")]
    pub created: Option<DateTime<Utc>>,
    #[serde(serialize_with = "serialize_optional")]
    pub updated: Option<DateTime<Utc>>,
    pub versions: Vec<VersionListing>,
}

/// A plugin version as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionListing {
    pub name: String,
    pub hash: String,
    #[serde(serialize_with = "serialize_optional")]
    pub created: Option<DateTime<Utc>>,
    pub downloads: i64,
    pub updates: i64,
}

impl From<&Plugin> for PluginListing {
    fn from(plugin: &Plugin) -> Self {
        Self {
            id: plugin.upstream_id.unwrap_or(plugin.id),
            name: plugin.name.clone(),
            author: plugin.author.clone(),
            description: plugin.description.clone(),
            tags: plugin.tags.clone(),
            image_url: plugin.image_url.clone(),
            visible: plugin.visible,
            downloads: plugin.downloads,
            updates: plugin.updates,
            created: plugin.created,
            updated: plugin.updated,
            versions: plugin.versions.iter().map(VersionListing::from).collect(),
        }
    }
}

impl From<&PluginVersion> for VersionListing {
    fn from(version: &PluginVersion) -> Self {
        Self {
            name: version.name.clone(),
            hash: version.hash.clone(),
            created: version.created,
            downloads: version.downloads,
            updates: version.updates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn plugin(upstream_id: Option<i64>) -> Plugin {
        Plugin {
            id: 1,
            upstream_id,
            name: "Foo".to_string(),
            author: None,
            description: Some("Does foo".to_string()),
            tags: vec!["root".to_string()],
            visible: true,
            image_url: None,
            downloads: 2,
            updates: 0,
            created: Some(Utc.with_ymd_and_hms(2025, 10, 15, 22, 29, 47).unwrap()),
            updated: None,
            versions: vec![PluginVersion {
                id: 4,
                plugin_id: 1,
                name: "1.0.0".to_string(),
                hash: "abc".to_string(),
                artifact: Some("https://cdn.example.com/foo.zip".to_string()),
                created: Some(Utc.with_ymd_and_hms(2025, 10, 15, 22, 29, 47).unwrap()),
                downloads: 2,
                updates: 0,
            }],
        }
    }

    #[test]
    fn test_listing_prefers_upstream_id() {
        assert_eq!(PluginListing::from(&plugin(Some(7))).id, 7);
        assert_eq!(PluginListing::from(&plugin(None)).id, 1);
    }

    #[test]
    fn test_listing_json_shape() {
        let value = serde_json::to_value(PluginListing::from(&plugin(Some(7)))).unwrap();

        assert_eq!(value["created"], json!("2025-10-15T22:29:47Z"));
        assert_eq!(value["updated"], json!(null));
        assert_eq!(
            value["versions"],
            json!([{
                "name": "1.0.0",
                "hash": "abc",
                "created": "2025-10-15T22:29:47Z",
                "downloads": 2,
                "updates": 0
            }])
        );
        // Artifact locations are not part of the public projection
        assert!(value["versions"][0].get("artifact").is_none());
    }
}
