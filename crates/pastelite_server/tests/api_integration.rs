//! Integration tests for the pastelite HTTP API and pages.

mod support;

use axum::http::StatusCode;
use pastelite_core::TEST_NOW_HEADER;
use pastelite_server::Config;
use serde_json::{json, Value};
use support::{setup_memory_app, setup_memory_app_with, setup_redb_app, test_config, T0_MS};

fn ms(offset: i64) -> String {
    (T0_MS + offset).to_string()
}

async fn create(server: &axum_test::TestServer, body: Value) -> String {
    let response = server
        .post("/api/pastes")
        .add_header(TEST_NOW_HEADER, ms(0))
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED, "{}", response.text());
    let created: Value = response.json();
    created["id"].as_str().expect("id").to_string()
}

#[tokio::test]
async fn test_paste_round_trip_without_limits() {
    let app = setup_memory_app();
    let id = create(&app.server, json!({ "content": "Hello, World!" })).await;

    for _ in 0..2 {
        let response = app.server.get(&format!("/api/pastes/{}", id)).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["content"], "Hello, World!");
        assert_eq!(body["remaining_views"], Value::Null);
        assert_eq!(body["expires_at"], Value::Null);
    }
}

#[tokio::test]
async fn test_views_run_out_then_404() {
    let app = setup_memory_app();
    let id = create(&app.server, json!({ "content": "twice", "max_views": 2 })).await;

    for expected in [1, 0] {
        let response = app.server.get(&format!("/api/pastes/{}", id)).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["remaining_views"], expected);
    }

    let gone = app.server.get(&format!("/api/pastes/{}", id)).await;
    assert_eq!(gone.status_code(), StatusCode::NOT_FOUND);
    let body: Value = gone.json();
    assert_eq!(body["error"], "Paste not found or unavailable");
}

#[tokio::test]
async fn test_ttl_honors_test_clock_header() {
    let app = setup_memory_app();
    let id = create(&app.server, json!({ "content": "timed", "ttl_seconds": 60 })).await;

    let alive = app
        .server
        .get(&format!("/api/pastes/{}", id))
        .add_header(TEST_NOW_HEADER, ms(59_000))
        .await;
    assert_eq!(alive.status_code(), StatusCode::OK);
    let body: Value = alive.json();
    assert_eq!(body["expires_at"], "2026-01-01T00:00:00.000Z");

    let expired = app
        .server
        .get(&format!("/api/pastes/{}", id))
        .add_header(TEST_NOW_HEADER, ms(60_000))
        .await;
    assert_eq!(expired.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clock_header_is_ignored_outside_test_mode() {
    let app = setup_memory_app_with(Config {
        test_mode: false,
        ..test_config()
    });
    let id = create(&app.server, json!({ "content": "timed", "ttl_seconds": 60 })).await;

    let response = app
        .server
        .get(&format!("/api/pastes/{}", id))
        .add_header(TEST_NOW_HEADER, ms(3_600_000))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_id_is_404() {
    let app = setup_memory_app();
    let response = app.server.get("/api/pastes/nope").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_rejects_each_invalid_field() {
    let app = setup_memory_app();
    let cases = [
        (json!({ "content": "" }), Some("content must be a non-empty string")),
        (json!({ "content": "   \n" }), Some("content must be a non-empty string")),
        (json!({ "content": "x", "ttl_seconds": 0 }), Some("ttl_seconds must be an integer >= 1")),
        (json!({ "content": "x", "max_views": -3 }), Some("max_views must be an integer >= 1")),
        (
            json!({ "content": "x", "ttl_seconds": 1.5 }),
            Some("ttl_seconds must be an integer >= 1"),
        ),
        (json!({ "content": "x", "max_views": "3" }), None),
        (json!({ "content": 42 }), None),
        (json!({ "ttl_seconds": 10 }), None),
    ];

    for (body, details) in cases {
        let response = app.server.post("/api/pastes").json(&body).await;
        assert_eq!(
            response.status_code(),
            StatusCode::BAD_REQUEST,
            "body: {}",
            body
        );
        let error: Value = response.json();
        assert_eq!(error["error"], "Invalid input", "body: {}", body);
        if let Some(details) = details {
            assert_eq!(error["details"], details, "body: {}", body);
        }
    }
}

#[tokio::test]
async fn test_create_treats_null_limits_as_absent() {
    let app = setup_memory_app();
    let id = create(
        &app.server,
        json!({ "content": "x", "ttl_seconds": null, "max_views": null }),
    )
    .await;
    let body: Value = app.server.get(&format!("/api/pastes/{}", id)).await.json();
    assert_eq!(body["remaining_views"], Value::Null);
    assert_eq!(body["expires_at"], Value::Null);
}

#[tokio::test]
async fn test_create_accepts_integral_float_limits() {
    let app = setup_memory_app();
    let id = create(
        &app.server,
        json!({ "content": "x", "ttl_seconds": 60.0, "max_views": 2.0 }),
    )
    .await;
    let body: Value = app
        .server
        .get(&format!("/api/pastes/{}", id))
        .add_header(TEST_NOW_HEADER, ms(0))
        .await
        .json();
    assert_eq!(body["remaining_views"], 1);
    assert_eq!(body["expires_at"], "2026-01-01T00:00:00.000Z");
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = setup_memory_app();
    let response = app
        .server
        .post("/api/pastes")
        .text("{\"content\": ")
        .content_type("application/json")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert_eq!(error["error"], "Invalid JSON");
}

#[tokio::test]
async fn test_oversized_content_is_rejected() {
    let app = setup_memory_app();
    let limit = test_config().max_paste_size;

    let just_over = app
        .server
        .post("/api/pastes")
        .json(&json!({ "content": "a".repeat(limit + 1) }))
        .await;
    assert_eq!(just_over.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

    let far_over = app
        .server
        .post("/api/pastes")
        .json(&json!({ "content": "a".repeat(limit * 4) }))
        .await;
    assert_eq!(far_over.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

    let at_limit = app
        .server
        .post("/api/pastes")
        .json(&json!({ "content": "a".repeat(limit) }))
        .await;
    assert_eq!(at_limit.status_code(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_share_url_uses_public_url_when_configured() {
    let app = setup_memory_app_with(Config {
        public_url: Some("https://paste.example.com".to_string()),
        ..test_config()
    });
    let response = app
        .server
        .post("/api/pastes")
        .json(&json!({ "content": "link" }))
        .await;
    let body: Value = response.json();
    let id = body["id"].as_str().expect("id");
    assert_eq!(body["url"], format!("https://paste.example.com/p/{}", id));
}

#[tokio::test]
async fn test_share_url_follows_forwarded_headers() {
    let app = setup_memory_app();
    let response = app
        .server
        .post("/api/pastes")
        .add_header("host", "paste.internal:8080")
        .add_header("x-forwarded-proto", "https")
        .json(&json!({ "content": "link" }))
        .await;
    let body: Value = response.json();
    let id = body["id"].as_str().expect("id");
    assert_eq!(body["url"], format!("https://paste.internal:8080/p/{}", id));
}

#[tokio::test]
async fn test_healthz_reports_backend_state() {
    let app = setup_memory_app();
    let healthy = app.server.get("/api/healthz").await;
    assert_eq!(healthy.status_code(), StatusCode::OK);
    let body: Value = healthy.json();
    assert_eq!(body, json!({ "ok": true }));

    app.backend.close().await.expect("close");
    let down = app.server.get("/api/healthz").await;
    assert_eq!(down.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = down.json();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "Storage unavailable");
}

#[tokio::test]
async fn test_closed_backend_is_500_not_404() {
    let app = setup_memory_app();
    app.backend.close().await.expect("close");
    let response = app.server.get("/api/pastes/anything").await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn test_view_page_escapes_content_and_consumes_view() {
    let app = setup_memory_app();
    let id = create(
        &app.server,
        json!({ "content": "<script>alert('x')</script>", "max_views": 1 }),
    )
    .await;

    let page = app.server.get(&format!("/p/{}", id)).await;
    assert_eq!(page.status_code(), StatusCode::OK);
    let html = page.text();
    assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
    assert!(!html.contains("<script>alert("));
    assert!(html.contains("Remaining views: 0"));

    let api = app.server.get(&format!("/api/pastes/{}", id)).await;
    assert_eq!(api.status_code(), StatusCode::NOT_FOUND);

    let missing = app.server.get(&format!("/p/{}", id)).await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_index_serves_form_with_security_headers() {
    let app = setup_memory_app();
    let response = app.server.get("/").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("<form id=\"paste-form\">"));
    response.assert_header("x-content-type-options", "nosniff");
    response.assert_header("x-frame-options", "DENY");
    assert!(response.contains_header("content-security-policy"));
}

#[tokio::test]
async fn test_strict_cors_rejects_foreign_origin() {
    let app = setup_memory_app();
    let response = app
        .server
        .get("/api/healthz")
        .add_header("origin", "http://example.com:3000")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(!response.contains_header("access-control-allow-origin"));
}

#[tokio::test]
async fn test_redb_backed_lifecycle() {
    let app = setup_redb_app();
    let id = create(&app.server, json!({ "content": "durable", "max_views": 3 })).await;

    for expected in [2, 1, 0] {
        let body: Value = app.server.get(&format!("/api/pastes/{}", id)).await.json();
        assert_eq!(body["content"], "durable");
        assert_eq!(body["remaining_views"], expected);
    }
    let gone = app.server.get(&format!("/api/pastes/{}", id)).await;
    assert_eq!(gone.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_backend_ttl_reclaims_untouched_pastes() {
    let app = setup_memory_app();
    let id = create(&app.server, json!({ "content": "fleeting", "ttl_seconds": 5 })).await;

    app.clock.advance(std::time::Duration::from_secs(5));
    let key = format!("paste:{}", id);
    assert!(app.backend.get(&key).await.expect("get").is_none());
}
