//! Types for the upstream catalog document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::UpstreamError;

/// One plugin entry as published by the upstream feed.
///
/// Every field is optional: the feed is untrusted and entries are merged
/// field by field. Only `id` must be well-typed; any other field with an
/// unexpected JSON type decodes as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamPlugin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub author: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub tags: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub downloads: Option<i64>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub updates: Option<i64>,
    /// ISO-8601 timestamp, kept raw; parsed during reconciliation.
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_versions",
        skip_serializing_if = "Option::is_none"
    )]
    pub versions: Option<Vec<UpstreamVersion>>,
}

/// One version entry nested in an [`UpstreamPlugin`].
///
/// Wrongly typed fields decode as `None`; a version without a usable `name`
/// and `hash` is dropped during reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamVersion {
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub hash: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub artifact: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub downloads: Option<i64>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub updates: Option<i64>,
}

/// Decode a field, mapping a value of the wrong JSON type to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Decode a version list; an element that is not an object becomes an empty
/// version, which reconciliation then skips.
fn lenient_versions<'de, D>(deserializer: D) -> Result<Option<Vec<UpstreamVersion>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .map(|item| UpstreamVersion::deserialize(item).unwrap_or_default())
                .collect(),
        )),
        _ => Ok(None),
    }
}

/// Accepted top-level shapes of the catalog document.
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    Wrapped { plugins: Vec<Value> },
    Bare(Vec<Value>),
}

/// A parsed catalog document.
///
/// Only the top-level shape is checked up front. Entries stay as raw JSON so
/// that one malformed entry cannot reject the whole snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamSnapshot {
    entries: Vec<Value>,
}

impl UpstreamSnapshot {
    /// Parse a catalog document: `{"plugins": [...]}` or a bare array.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, UpstreamError> {
        let document: CatalogDocument = serde_json::from_slice(bytes).map_err(|e| {
            UpstreamError::Parse(format!("not a plugin catalog document: {}", e))
        })?;

        let entries = match document {
            CatalogDocument::Wrapped { plugins } => plugins,
            CatalogDocument::Bare(plugins) => plugins,
        };

        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<Value>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode each entry, in document order.
    pub fn plugins(&self) -> impl Iterator<Item = Result<UpstreamPlugin, serde_json::Error>> + '_ {
        self.entries
            .iter()
            .map(|entry| UpstreamPlugin::deserialize(entry))
    }
}

impl From<Vec<UpstreamPlugin>> for UpstreamSnapshot {
    fn from(plugins: Vec<UpstreamPlugin>) -> Self {
        let entries = plugins
            .iter()
            .filter_map(|plugin| serde_json::to_value(plugin).ok())
            .collect();
        Self { entries }
    }
}
