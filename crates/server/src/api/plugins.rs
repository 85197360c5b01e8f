//! Public catalog API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use plugin_store_core::{CatalogError, CounterKind, PluginListing, SyncError};

use super::handlers::{error_response, store_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListPluginsParams {
    /// Case-insensitive substring of name or description.
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IncrementParams {
    /// Required; a missing or non-boolean value is rejected with 400.
    #[serde(rename = "isUpdate")]
    pub is_update: bool,
}

/// Empty object body.
#[derive(Debug, Serialize)]
pub struct IncrementResponse {}

// ============================================================================
// Handlers
// ============================================================================

/// GET /plugins
///
/// Reconcile against upstream, then list visible plugins.
pub async fn list_plugins(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListPluginsParams>,
) -> Result<Json<Vec<PluginListing>>, ApiError> {
    match state.catalog().list_plugins(params.query.as_deref()).await {
        Ok(plugins) => Ok(Json(plugins)),
        Err(CatalogError::Sync(SyncError::Upstream(e))) => {
            warn!(error = %e, "Catalog unavailable");
            Err(error_response(
                StatusCode::BAD_GATEWAY,
                format!("Upstream catalog unavailable: {}", e),
            ))
        }
        Err(CatalogError::Sync(SyncError::Store(e))) | Err(CatalogError::Store(e)) => {
            Err(store_error(e))
        }
    }
}

/// POST /plugins/{plugin_name}/versions/{version_name}/increment
///
/// Record a download (`isUpdate=false`) or an update (`isUpdate=true`).
pub async fn increment_counter(
    State(state): State<Arc<AppState>>,
    Path((plugin_name, version_name)): Path<(String, String)>,
    Query(params): Query<IncrementParams>,
) -> Result<Json<IncrementResponse>, ApiError> {
    let kind = CounterKind::from_is_update(params.is_update);

    state
        .counters()
        .increment(&plugin_name, &version_name, kind)
        .map_err(store_error)?;

    Ok(Json(IncrementResponse {}))
}
