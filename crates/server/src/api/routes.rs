use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{handlers, internal, plugins};
use super::middleware::{auth_middleware, metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Curation routes (admin token required)
    let internal_routes = Router::new()
        .route(
            "/plugins",
            get(internal::list_plugins).post(internal::create_plugin),
        )
        .route(
            "/plugins/{id}/versions",
            get(internal::list_versions).post(internal::publish_version),
        )
        .route("/plugins/{id}/visibility", patch(internal::set_visibility))
        .route("/config", get(handlers::get_config))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ));

    Router::new()
        // Health and metrics
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        // Public catalog
        .route("/plugins", get(plugins::list_plugins))
        .route(
            "/plugins/{plugin_name}/versions/{version_name}/increment",
            post(plugins::increment_counter),
        )
        .nest("/internal", internal_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
