//! Common test utilities for API testing with a mock executor.
//!
//! This module provides a test fixture that creates an in-process router
//! backed by a real dispatcher whose job body is a `MockExecutor`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use kitchen_core::{testing::MockExecutor, Config, Dispatcher, DispatcherConfig, ServerConfig};
use kitchen_server::api::{create_router, WsBroadcaster};
use kitchen_server::state::AppState;

/// Re-export fixtures for test convenience
#[allow(unused_imports)]
pub use kitchen_core::testing::fixtures;

/// Test fixture for API testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submit() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/v1/orders", json!({
///         "station_id": 3, "item_kind": "burger", "priority": "vip"
///     })).await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Dispatcher behind the router
    pub dispatcher: Arc<Dispatcher>,
    /// Mock job body - inspect executions, inject failures
    pub executor: MockExecutor,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a fixture with two workers and instant jobs.
    pub fn new() -> Self {
        Self::with_dispatcher(DispatcherConfig::default().with_workers(2), MockExecutor::new())
    }

    /// Create a fixture with a custom dispatcher config and executor.
    pub fn with_dispatcher(dispatcher_config: DispatcherConfig, executor: MockExecutor) -> Self {
        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            dispatcher: dispatcher_config.clone(),
        };

        let dispatcher = Arc::new(
            Dispatcher::start(dispatcher_config, Arc::new(executor.clone()))
                .expect("Failed to start dispatcher"),
        );
        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&dispatcher),
            WsBroadcaster::default(),
        ));

        Self {
            router: create_router(state),
            dispatcher,
            executor,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Poll `/stats` until `done` holds for the body.
    #[allow(dead_code)]
    pub async fn wait_for_stats<F>(&self, done: F) -> Value
    where
        F: Fn(&Value) -> bool,
    {
        for _ in 0..200 {
            let response = self.get("/api/v1/stats").await;
            if done(&response.body) {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("stats condition not reached");
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

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

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
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
