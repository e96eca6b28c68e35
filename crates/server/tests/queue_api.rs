//! Waiting-room API integration tests.
//!
//! Drive the router in-process over the in-memory store.

mod common;

use axum::http::{header, StatusCode};
use serde_json::json;
use std::time::Duration;

use common::TestFixture;
use waitroom_core::StoreError;

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "status", json!("ok"));
}

#[tokio::test]
async fn test_config_redacts_redis_credentials() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/config").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["queue"]["event_id"], "test-event");
    assert_eq!(response.body["store"]["backend"], "memory");
    let url = response.body["store"]["redis_url"].as_str().unwrap();
    assert!(!url.contains("hunter2"), "redis_url leaked: {}", url);
}

#[tokio::test]
async fn test_join_issues_ticket() {
    let fixture = TestFixture::new().await;

    let response = fixture.post_empty("/api/v1/queue/join?user_id=alice").await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "user_id", json!("alice"));
    assert_json_path!(response.body, "state", json!("waiting"));
    assert_json_path!(response.body, "ticket", json!(1));
    assert_json_path!(response.body, "position", json!(1));
    assert_json_path!(response.body, "eta_seconds", json!(0));
    assert_json_path!(response.body, "now_serving", json!(0));
    assert_json_path!(response.body, "next_ticket", json!(1));
    assert_json_path!(response.body, "admit_rate", json!(10));
    assert!(response.headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_join_is_idempotent() {
    let fixture = TestFixture::new().await;

    fixture.get("/api/v1/queue/join?user_id=alice").await;
    fixture.get("/api/v1/queue/join?user_id=bob").await;
    let again = fixture.get("/api/v1/queue/join?user_id=alice").await;

    assert_status!(again, StatusCode::OK);
    assert_json_path!(again.body, "ticket", json!(1));
    assert_json_path!(again.body, "next_ticket", json!(2));
}

#[tokio::test]
async fn test_join_without_identity_mints_cookie() {
    let fixture = TestFixture::new().await;

    let response = fixture.post_empty("/api/v1/queue/join").await;
    assert_status!(response, StatusCode::OK);

    let cookie = response
        .headers
        .get(header::SET_COOKIE)
        .expect("Set-Cookie missing")
        .to_str()
        .unwrap()
        .to_string();
    let user_id = response.body["user_id"].as_str().unwrap().to_string();
    assert!(cookie.starts_with(&format!("waitroom_uid={};", user_id)));

    // The cookie alone identifies the client on later calls.
    let cookie_pair = cookie.split(';').next().unwrap();
    let status = fixture
        .get_with_cookie("/api/v1/queue/status", cookie_pair)
        .await;
    assert_status!(status, StatusCode::OK);
    assert_json_path!(status.body, "state", json!("waiting"));
    assert_json_path!(status.body, "ticket", json!(1));

    let rejoin = fixture
        .get_with_cookie("/api/v1/queue/join", cookie_pair)
        .await;
    assert_json_path!(rejoin.body, "ticket", json!(1));
    assert!(rejoin.headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_join_rejects_blank_identity() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/queue/join?user_id=%20%20").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_status_lifecycle() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/queue/status?user_id=ghost").await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_json_path!(response.body, "state", json!("not_in_queue"));

    for i in 1..=15 {
        fixture
            .post_empty(&format!("/api/v1/queue/join?user_id=U{}", i))
            .await;
    }
    fixture.worker.tick().await.unwrap();

    let waiting = fixture.get("/api/v1/queue/status?user_id=U11").await;
    assert_status!(waiting, StatusCode::OK);
    assert_json_path!(waiting.body, "state", json!("waiting"));
    assert_json_path!(waiting.body, "position", json!(1));
    assert_json_path!(waiting.body, "eta_seconds", json!(0));
    assert_json_path!(waiting.body, "now_serving", json!(10));

    let admitted = fixture.get("/api/v1/queue/status?user_id=U1").await;
    assert_status!(admitted, StatusCode::OK);
    assert_json_path!(admitted.body, "state", json!("admitted"));
    assert_json_path!(admitted.body, "ticket", json!(1));
    assert!(admitted.body["credential"]["token"].is_string());

    let rejoin = fixture.post_empty("/api/v1/queue/join?user_id=U1").await;
    assert_status!(rejoin, StatusCode::OK);
    assert_json_path!(rejoin.body, "state", json!("admitted"));
    assert_json_path!(rejoin.body, "ticket", json!(1));
    assert_json_path!(rejoin.body, "position", json!(0));
    assert_json_path!(rejoin.body, "next_ticket", json!(15));
}

#[tokio::test]
async fn test_status_requires_identity() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/queue/status").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats() {
    let fixture = TestFixture::new().await;
    for i in 1..=3 {
        fixture
            .post_empty(&format!("/api/v1/queue/join?user_id=u{}", i))
            .await;
    }

    let response = fixture.get("/api/v1/queue/stats").await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "event_id", json!("test-event"));
    assert_json_path!(response.body, "waiting", json!(3));
    assert_json_path!(response.body, "next_ticket", json!(3));
    assert_json_path!(response.body, "now_serving", json!(0));
    assert_json_path!(response.body, "admit_rate", json!(10));
    assert_json_path!(response.body, "rate_source", json!("fallback"));
}

#[tokio::test]
async fn test_store_failure_returns_503() {
    let fixture = TestFixture::new().await;
    fixture
        .store
        .fail_on("issue_ticket", StoreError::Connection("refused".to_string()))
        .await;

    let response = fixture.post_empty("/api/v1/queue/join?user_id=alice").await;
    assert_status!(response, StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_store_timeout_returns_503() {
    let fixture = TestFixture::new().await;
    fixture.store.set_latency(Duration::from_secs(5)).await;

    let response = tokio::time::timeout(
        Duration::from_secs(10),
        fixture.get("/api/v1/queue/status?user_id=alice"),
    )
    .await
    .expect("request should hit the store deadline first");
    assert_status!(response, StatusCode::SERVICE_UNAVAILABLE);
}
