//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock upstream catalog injected, enabling E2E testing without
//! network access.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use plugin_store_core::{
    testing::MockCatalogSource, AdminConfig, Config, DatabaseConfig, Plugin, PluginStore,
    SqlitePluginStore, TokenAuthenticator,
};

/// Re-export fixtures for test convenience
pub use plugin_store_core::testing::fixtures;

/// Admin token configured on the default fixture.
pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Test fixture for E2E testing with a mock upstream.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_listing() {
///     let fixture = TestFixture::new().await;
///     fixture.source.add_plugin(fixtures::upstream_plugin(7, "Foo", &[("1.0.0", "abc")])).await;
///
///     let response = fixture.get("/plugins").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock upstream - configure the served snapshot
    pub source: Arc<MockCatalogSource>,
    /// Direct store access for assertions
    pub store: Arc<SqlitePluginStore>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with an admin token configured.
    pub async fn new() -> Self {
        Self::with_token(Some(ADMIN_TOKEN)).await
    }

    /// Create a test fixture with the given admin token (or none).
    pub async fn with_token(token: Option<&str>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let source = Arc::new(MockCatalogSource::new());
        let store = Arc::new(SqlitePluginStore::new(&db_path).expect("Failed to create store"));

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            admin: AdminConfig {
                token: token.map(str::to_string),
            },
            ..Default::default()
        };

        let state = Arc::new(plugin_store_server::state::AppState::new(
            config,
            Arc::new(TokenAuthenticator::new(token.map(str::to_string))),
            Arc::clone(&store) as Arc<dyn PluginStore>,
            Arc::clone(&source) as Arc<dyn plugin_store_core::CatalogSource>,
        ));

        let router = plugin_store_server::api::create_router(state);

        Self {
            router,
            source,
            store,
            temp_dir,
        }
    }

    /// Local id of a synced upstream plugin.
    pub fn local_id(&self, upstream_id: i64) -> i64 {
        self.store
            .find_by_upstream_id(upstream_id)
            .expect("lookup failed")
            .expect("plugin not synced")
            .id
    }

    /// Stored row of a synced upstream plugin, with its versions.
    pub fn store_plugin(&self, upstream_id: i64) -> Plugin {
        self.store
            .find_by_upstream_id(upstream_id)
            .expect("lookup failed")
            .expect("plugin not synced")
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    /// Send a POST request with optional JSON body.
    pub async fn post(&self, path: &str, body: Option<Value>) -> TestResponse {
        self.request("POST", path, body, None).await
    }

    /// Send a GET request with the admin token.
    pub async fn admin_get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, Some(ADMIN_TOKEN)).await
    }

    /// Send a POST request with JSON body and the admin token.
    pub async fn admin_post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), Some(ADMIN_TOKEN))
            .await
    }

    /// Send a PATCH request with JSON body and the admin token.
    pub async fn admin_patch(&self, path: &str, body: Value) -> TestResponse {
        self.request("PATCH", path, Some(body), Some(ADMIN_TOKEN))
            .await
    }

    /// Send a request with an explicit token (or none).
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some(token) = token {
            request_builder = request_builder.header("X-Plugin-Store-Token", token);
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
