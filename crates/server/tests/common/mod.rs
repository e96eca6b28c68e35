//! Common test utilities for API testing.
//!
//! This module provides a test fixture that builds the router in-process
//! over an in-memory (optionally failure-injecting) queue store, so the
//! HTTP surface can be tested without Redis.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use waitroom_core::{
    admission::AdmissionConfig,
    config::{QueueConfig, ServerConfig, StoreConfig},
    testing::MockQueueStore,
    AdmissionWorker, Config, QueueService, QueueSettings, QueueStore, StoreBackend,
};

/// Re-export fixtures for test convenience
pub use waitroom_core::testing::fixtures;

/// Test fixture for API testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_join() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/queue/join?user_id=u1", json!({})).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Store behind the queue - seed state or inject failures
    pub store: Arc<MockQueueStore>,
    /// Queue service shared with the router
    pub queue: Arc<QueueService>,
    /// Admission worker (not started; drive it with `tick`)
    pub worker: Arc<AdmissionWorker>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture.
    pub async fn new() -> Self {
        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 8080, // Not used for in-process testing
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
                redis_url: "redis://:hunter2@127.0.0.1:6379".to_string(),
                operation_timeout_ms: 2000,
            },
            queue: QueueConfig {
                event_id: "test-event".to_string(),
                fallback_admit_rate: 10,
                initial_admit_rate: None,
            },
            admission: AdmissionConfig {
                enabled: false,
                ..Default::default()
            },
        };

        let store = Arc::new(MockQueueStore::new());
        let queue = Arc::new(QueueService::new(
            Arc::clone(&store) as Arc<dyn QueueStore>,
            QueueSettings::from(&config),
        ));
        let worker = Arc::new(AdmissionWorker::new(
            config.admission.clone(),
            Arc::clone(&queue),
        ));

        let state = Arc::new(waitroom_server::state::AppState::new(
            config,
            Arc::clone(&queue),
            Arc::clone(&worker),
        ));

        // Create router
        let router = waitroom_server::api::create_router(state);

        Self {
            router,
            store,
            queue,
            worker,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, &[]).await
    }

    /// Send a GET request with a cookie header.
    pub async fn get_with_cookie(&self, path: &str, cookie: &str) -> TestResponse {
        self.request("GET", path, None, &[("Cookie", cookie)]).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), &[]).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None, &[]).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body), &[]).await
    }

    /// Send a request to the test server.
    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            request_builder = request_builder.header(*name, *value);
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
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
            text,
        }
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

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
