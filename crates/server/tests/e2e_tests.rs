//! End-to-end tests driving the router in-process with a mock upstream.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{fixtures, TestFixture};

// ============================================================================
// Health / metrics
// ============================================================================

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint_is_plain_text() {
    let fixture = TestFixture::new().await;
    fixture.get("/plugins").await;

    let request = axum::http::Request::builder()
        .uri("/metrics")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(fixture.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .unwrap()
        .to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("plugin_store_http_requests_total"));
    assert!(text.contains("plugin_store_sync_runs_total"));
}

// ============================================================================
// Public catalog
// ============================================================================

#[tokio::test]
async fn test_synced_plugins_start_hidden() {
    let fixture = TestFixture::new().await;
    fixture
        .source
        .add_plugin(fixtures::upstream_plugin(7, "Foo", &[("1.0.0", "abc")]))
        .await;

    let response = fixture.get("/plugins").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body, json!([]));

    // The sync did happen
    let response = fixture.admin_get("/internal/plugins").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body[0]["upstream_id"], 7);
    assert_eq!(response.body[0]["visible"], false);
}

#[tokio::test]
async fn test_foo_scenario_over_http() {
    let fixture = TestFixture::new().await;
    fixture
        .source
        .add_plugin(fixtures::upstream_plugin(7, "Foo", &[("1.0.0", "abc")]))
        .await;

    fixture.get("/plugins").await;
    let local_id = fixture.local_id(7);

    let response = fixture
        .admin_patch(
            &format!("/internal/plugins/{}/visibility", local_id),
            json!({"visible": true}),
        )
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({"id": local_id, "name": "Foo", "visible": true})
    );

    let response = fixture.get("/plugins").await;
    assert_status!(response, StatusCode::OK);
    let plugins = response.body.as_array().unwrap();
    assert_eq!(plugins.len(), 1);
    assert_eq!(plugins[0]["id"], 7);
    assert_eq!(plugins[0]["name"], "Foo");
    assert_eq!(plugins[0]["visible"], true);
    assert_eq!(plugins[0]["versions"].as_array().unwrap().len(), 1);
    assert_eq!(plugins[0]["versions"][0]["name"], "1.0.0");
    assert_eq!(plugins[0]["versions"][0]["hash"], "abc");
    assert_eq!(plugins[0]["created"], "2025-10-15T22:29:47Z");

    for _ in 0..2 {
        let response = fixture
            .post("/plugins/Foo/versions/1.0.0/increment?isUpdate=false", None)
            .await;
        assert_status!(response, StatusCode::OK);
        assert_eq!(response.body, json!({}));
    }

    let response = fixture.get("/plugins").await;
    let plugin = &response.body[0];
    assert_eq!(plugin["downloads"], 2);
    assert_eq!(plugin["updates"], 0);
    assert_eq!(plugin["versions"][0]["downloads"], 2);
    assert_eq!(plugin["versions"][0]["updates"], 0);
}

#[tokio::test]
async fn test_increment_update_flag() {
    let fixture = TestFixture::new().await;
    fixture
        .source
        .add_plugin(fixtures::upstream_plugin(7, "Foo", &[("1.0.0", "abc")]))
        .await;
    fixture.get("/plugins").await;

    let response = fixture
        .post("/plugins/Foo/versions/1.0.0/increment?isUpdate=true", None)
        .await;
    assert_status!(response, StatusCode::OK);

    let response = fixture
        .post("/plugins/Foo/versions/1.0.0/increment?isUpdate=false", None)
        .await;
    assert_status!(response, StatusCode::OK);

    let plugin = fixture.store_plugin(7);
    assert_eq!(plugin.updates, 1);
    assert_eq!(plugin.downloads, 1);
    assert_eq!(plugin.versions[0].updates, 1);
    assert_eq!(plugin.versions[0].downloads, 1);
}

#[tokio::test]
async fn test_increment_requires_update_flag() {
    let fixture = TestFixture::new().await;
    fixture
        .source
        .add_plugin(fixtures::upstream_plugin(7, "Foo", &[("1.0.0", "abc")]))
        .await;
    fixture.get("/plugins").await;

    let response = fixture
        .post("/plugins/Foo/versions/1.0.0/increment", None)
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);

    let response = fixture
        .post("/plugins/Foo/versions/1.0.0/increment?isUpdate=maybe", None)
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);

    let plugin = fixture.store_plugin(7);
    assert_eq!(plugin.downloads, 0);
    assert_eq!(plugin.updates, 0);
    assert_eq!(plugin.versions[0].downloads, 0);
    assert_eq!(plugin.versions[0].updates, 0);
}

#[tokio::test]
async fn test_increment_unknown_returns_404() {
    let fixture = TestFixture::new().await;
    fixture
        .source
        .add_plugin(fixtures::upstream_plugin(7, "Foo", &[("1.0.0", "abc")]))
        .await;
    fixture.get("/plugins").await;

    let response = fixture
        .post("/plugins/Nope/versions/1.0.0/increment?isUpdate=false", None)
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert!(response.body["error"].as_str().unwrap().contains("Nope"));

    let response = fixture
        .post("/plugins/Foo/versions/9.9.9/increment?isUpdate=false", None)
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);

    let plugin = fixture.store_plugin(7);
    assert_eq!(plugin.downloads, 0);
    assert_eq!(plugin.versions.len(), 1);
}

#[tokio::test]
async fn test_increment_url_encoded_names() {
    let fixture = TestFixture::new().await;
    fixture
        .source
        .add_plugin(fixtures::upstream_plugin(3, "CSS Loader", &[("2.1.0", "c1")]))
        .await;
    fixture.get("/plugins").await;

    let path = format!(
        "/plugins/{}/versions/{}/increment?isUpdate=false",
        urlencoding::encode("CSS Loader"),
        urlencoding::encode("2.1.0")
    );
    let response = fixture.post(&path, None).await;
    assert_status!(response, StatusCode::OK);

    assert_eq!(fixture.store_plugin(3).downloads, 1);
}

#[tokio::test]
async fn test_search_query() {
    let fixture = TestFixture::new().await;
    let mut theme = fixtures::upstream_plugin(1, "Theme Loader", &[("1.0.0", "t1")]);
    theme.description = Some("Applies CSS themes".to_string());
    fixture
        .source
        .set_plugins(vec![
            theme,
            fixtures::upstream_plugin(2, "Audio", &[("1.0.0", "a1")]),
        ])
        .await;
    fixture.get("/plugins").await;

    for upstream_id in [1, 2] {
        let id = fixture.local_id(upstream_id);
        fixture
            .admin_patch(
                &format!("/internal/plugins/{}/visibility", id),
                json!({"visible": true}),
            )
            .await;
    }

    let response = fixture.get("/plugins?query=css").await;
    assert_status!(response, StatusCode::OK);
    let names: Vec<&str> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Theme Loader"]);

    let response = fixture.get("/plugins?query=AUDIO").await;
    assert_eq!(response.body.as_array().unwrap().len(), 1);

    let response = fixture.get("/plugins").await;
    assert_eq!(response.body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_upstream_failure_returns_502() {
    let fixture = TestFixture::new().await;
    fixture.source.set_unavailable(true).await;

    let response = fixture.get("/plugins").await;
    assert_status!(response, StatusCode::BAD_GATEWAY);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_every_listing_reconciles() {
    let fixture = TestFixture::new().await;

    fixture.get("/plugins").await;
    fixture.get("/plugins?query=x").await;
    assert_eq!(fixture.source.fetch_count(), 2);

    // Admin listing and counters read the store directly
    fixture.admin_get("/internal/plugins").await;
    fixture
        .post("/plugins/Foo/versions/1.0.0/increment?isUpdate=false", None)
        .await;
    assert_eq!(fixture.source.fetch_count(), 2);
}

#[tokio::test]
async fn test_concurrent_increments_over_http() {
    let fixture = TestFixture::new().await;
    fixture
        .source
        .add_plugin(fixtures::upstream_plugin(7, "Foo", &[("1.0.0", "abc")]))
        .await;
    fixture.get("/plugins").await;

    let requests = (0..100).map(|_| {
        fixture.post("/plugins/Foo/versions/1.0.0/increment?isUpdate=false", None)
    });
    let responses = futures::future::join_all(requests).await;
    assert!(responses.iter().all(|r| r.status == StatusCode::OK));

    let plugin = fixture.store_plugin(7);
    assert_eq!(plugin.downloads, 100);
    assert_eq!(plugin.versions[0].downloads, 100);
}

// ============================================================================
// Curation
// ============================================================================

#[tokio::test]
async fn test_curation_requires_token() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/internal/plugins").await;
    assert_status!(response, StatusCode::UNAUTHORIZED);

    let response = fixture
        .request("GET", "/internal/plugins", None, Some("wrong"))
        .await;
    assert_status!(response, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "Invalid or missing admin token.");
}

#[tokio::test]
async fn test_curation_unconfigured_returns_503() {
    let fixture = TestFixture::with_token(None).await;

    let response = fixture
        .request("GET", "/internal/plugins", None, Some("anything"))
        .await;
    assert_status!(response, StatusCode::SERVICE_UNAVAILABLE);

    // Public routes are unaffected
    let response = fixture.get("/plugins").await;
    assert_status!(response, StatusCode::OK);
}

#[tokio::test]
async fn test_create_and_publish_curated_plugin() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .admin_post(
            "/internal/plugins",
            json!({
                "name": "Local Tool",
                "author": "Curator",
                "tags": ["local", "tools"],
                "description": "Made here"
            }),
        )
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["name"], "Local Tool");
    let id = response.body["id"].as_i64().unwrap();

    let response = fixture
        .admin_post(
            &format!("/internal/plugins/{}/versions", id),
            json!({
                "name": "0.1.0",
                "hash": "deadbeef",
                "artifact": "https://cdn.example.com/local-tool-0.1.0.zip",
                "created": "2025-10-15T22:29:47Z"
            }),
        )
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["name"], "0.1.0");
    assert_eq!(response.body["hash"], "deadbeef");
    assert_eq!(response.body["created"], "2025-10-15T22:29:47Z");
    assert_eq!(response.body["downloads"], 0);
    assert_eq!(response.body["updates"], 0);

    // Hidden until curated visible
    let response = fixture.get("/plugins").await;
    assert_eq!(response.body, json!([]));

    fixture
        .admin_patch(
            &format!("/internal/plugins/{}/visibility", id),
            json!({"visible": true}),
        )
        .await;

    let response = fixture.get("/plugins").await;
    let plugins = response.body.as_array().unwrap();
    assert_eq!(plugins.len(), 1);
    // No upstream id, so the local id is exposed
    assert_eq!(plugins[0]["id"], id);
    assert_eq!(plugins[0]["tags"], json!(["local", "tools"]));
}

#[tokio::test]
async fn test_publish_defaults_created_to_now() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .admin_post("/internal/plugins", json!({"name": "Local"}))
        .await;
    let id = response.body["id"].as_i64().unwrap();

    let response = fixture
        .admin_post(
            &format!("/internal/plugins/{}/versions", id),
            json!({"name": "1.0.0", "hash": "h", "created": "whenever"}),
        )
        .await;
    assert_status!(response, StatusCode::OK);

    let created = response.body["created"].as_str().unwrap();
    assert!(created.ends_with('Z'));
    assert!(chrono::DateTime::parse_from_rfc3339(created).is_ok());
}

#[tokio::test]
async fn test_publish_duplicate_version_conflicts() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .admin_post("/internal/plugins", json!({"name": "Local"}))
        .await;
    let id = response.body["id"].as_i64().unwrap();
    let path = format!("/internal/plugins/{}/versions", id);

    let response = fixture
        .admin_post(&path, json!({"name": "1.0.0", "hash": "h"}))
        .await;
    assert_status!(response, StatusCode::OK);

    let response = fixture
        .admin_post(&path, json!({"name": "1.0.0", "hash": "h"}))
        .await;
    assert_status!(response, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_curation_not_found() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .admin_post(
            "/internal/plugins/999/versions",
            json!({"name": "1.0.0", "hash": "h"}),
        )
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);

    let response = fixture
        .admin_patch("/internal/plugins/999/visibility", json!({"visible": true}))
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);

    let response = fixture.admin_get("/internal/plugins/999/versions").await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_plugin_rejects_empty_name() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .admin_post("/internal/plugins", json!({"name": "  "}))
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_version_listing_in_id_order() {
    let fixture = TestFixture::new().await;
    fixture
        .source
        .add_plugin(fixtures::upstream_plugin(
            7,
            "Foo",
            &[("1.0.0", "a"), ("1.1.0", "b"), ("0.9.0", "c")],
        ))
        .await;
    fixture.get("/plugins").await;

    let response = fixture
        .admin_get(&format!("/internal/plugins/{}/versions", fixture.local_id(7)))
        .await;
    assert_status!(response, StatusCode::OK);

    let versions = response.body.as_array().unwrap();
    let names: Vec<&str> = versions
        .iter()
        .map(|v| v["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["1.0.0", "1.1.0", "0.9.0"]);
    assert!(versions[0]["id"].as_i64().unwrap() < versions[1]["id"].as_i64().unwrap());
    assert!(versions[0].get("artifact").is_some());
}

#[tokio::test]
async fn test_visibility_survives_resync() {
    let fixture = TestFixture::new().await;
    fixture
        .source
        .add_plugin(fixtures::upstream_plugin(7, "Foo", &[("1.0.0", "abc")]))
        .await;
    fixture.get("/plugins").await;

    fixture
        .admin_patch(
            &format!("/internal/plugins/{}/visibility", fixture.local_id(7)),
            json!({"visible": true}),
        )
        .await;

    for _ in 0..3 {
        let response = fixture.get("/plugins").await;
        assert_eq!(response.body.as_array().unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_internal_config_is_sanitized() {
    let fixture = TestFixture::new().await;

    let response = fixture.admin_get("/internal/config").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["admin"]["token_configured"], true);
    assert!(!response.body.to_string().contains(common::ADMIN_TOKEN));
}
