//! Curation API handlers, mounted under `/internal` behind the admin token.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use plugin_store_core::{
    timestamp::{parse_optional, serialize_optional},
    NewPlugin, NewPluginVersion, Plugin, PluginFilter, PluginVersion,
};

use super::handlers::{error_response, store_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreatePluginRequest {
    pub name: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatePluginResponse {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct PublishVersionRequest {
    pub name: String,
    pub hash: String,
    #[serde(default)]
    pub artifact: Option<String>,
    /// ISO-8601; now when absent or unparseable.
    #[serde(default)]
    pub created: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PublishVersionResponse {
    pub id: i64,
    pub name: String,
    pub hash: String,
    #[serde(serialize_with = "serialize_optional")]
    pub created: Option<DateTime<Utc>>,
    pub downloads: i64,
    pub updates: i64,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

#[derive(Debug, Serialize)]
pub struct VisibilityResponse {
    pub id: i64,
    pub name: String,
    pub visible: bool,
}

/// Row of the administrative plugin listing.
#[derive(Debug, Serialize)]
pub struct PluginSummary {
    pub id: i64,
    pub upstream_id: Option<i64>,
    pub name: String,
    pub visible: bool,
    pub downloads: i64,
    pub updates: i64,
}

impl From<&Plugin> for PluginSummary {
    fn from(plugin: &Plugin) -> Self {
        Self {
            id: plugin.id,
            upstream_id: plugin.upstream_id,
            name: plugin.name.clone(),
            visible: plugin.visible,
            downloads: plugin.downloads,
            updates: plugin.updates,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VersionDetail {
    pub id: i64,
    pub name: String,
    pub hash: String,
    pub artifact: Option<String>,
    #[serde(serialize_with = "serialize_optional")]
    pub created: Option<DateTime<Utc>>,
    pub downloads: i64,
    pub updates: i64,
}

impl From<PluginVersion> for VersionDetail {
    fn from(version: PluginVersion) -> Self {
        Self {
            id: version.id,
            name: version.name,
            hash: version.hash,
            artifact: version.artifact,
            created: version.created,
            downloads: version.downloads,
            updates: version.updates,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /internal/plugins
///
/// All plugins regardless of visibility. No reconciliation is triggered.
pub async fn list_plugins(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PluginSummary>>, ApiError> {
    let plugins = state
        .store()
        .list_plugins(&PluginFilter::all())
        .map_err(store_error)?;

    Ok(Json(plugins.iter().map(PluginSummary::from).collect()))
}

/// POST /internal/plugins
///
/// Create a curated plugin. It starts hidden and has no upstream id.
pub async fn create_plugin(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreatePluginRequest>,
) -> Result<Json<CreatePluginResponse>, ApiError> {
    if request.name.trim().is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Plugin name must not be empty",
        ));
    }

    let plugin = state
        .store()
        .create_plugin(NewPlugin {
            name: request.name,
            author: request.author,
            description: request.description,
            tags: request.tags,
            image_url: request.image_url,
        })
        .map_err(store_error)?;

    info!(plugin_id = plugin.id, name = %plugin.name, "Created curated plugin");

    Ok(Json(CreatePluginResponse {
        id: plugin.id,
        name: plugin.name,
    }))
}

/// POST /internal/plugins/{id}/versions
///
/// Publish a version under an existing plugin.
pub async fn publish_version(
    State(state): State<Arc<AppState>>,
    Path(plugin_id): Path<i64>,
    Json(request): Json<PublishVersionRequest>,
) -> Result<Json<PublishVersionResponse>, ApiError> {
    if request.name.trim().is_empty() || request.hash.trim().is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Version name and hash must not be empty",
        ));
    }

    let version = state
        .store()
        .publish_version(
            plugin_id,
            NewPluginVersion {
                name: request.name,
                hash: request.hash,
                artifact: request.artifact,
                created: parse_optional(request.created.as_deref()),
            },
        )
        .map_err(store_error)?;

    info!(
        plugin_id,
        version = %version.name,
        hash = %version.hash,
        "Published plugin version"
    );

    Ok(Json(PublishVersionResponse {
        id: version.id,
        name: version.name,
        hash: version.hash,
        created: version.created,
        downloads: version.downloads,
        updates: version.updates,
    }))
}

/// GET /internal/plugins/{id}/versions
///
/// Versions in ascending id order.
pub async fn list_versions(
    State(state): State<Arc<AppState>>,
    Path(plugin_id): Path<i64>,
) -> Result<Json<Vec<VersionDetail>>, ApiError> {
    let versions = state
        .store()
        .list_versions(plugin_id)
        .map_err(store_error)?;

    Ok(Json(versions.into_iter().map(VersionDetail::from).collect()))
}

/// PATCH /internal/plugins/{id}/visibility
pub async fn set_visibility(
    State(state): State<Arc<AppState>>,
    Path(plugin_id): Path<i64>,
    Json(request): Json<VisibilityRequest>,
) -> Result<Json<VisibilityResponse>, ApiError> {
    let plugin = state
        .store()
        .set_visibility(plugin_id, request.visible)
        .map_err(store_error)?;

    info!(plugin_id, visible = plugin.visible, "Changed plugin visibility");

    Ok(Json(VisibilityResponse {
        id: plugin.id,
        name: plugin.name,
        visible: plugin.visible,
    }))
}
