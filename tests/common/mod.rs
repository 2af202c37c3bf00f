#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use health_metrics_api::{
    Server,
    test_utils::{CountingStore, TEST_API_KEY, TestServerBuilder},
};
use health_metrics_api::store::{HealthStore, MemoryStore};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Drives the full router in-process
pub struct TestHarness {
    pub server: Server,
    pub app: Router,
    pub store: Arc<CountingStore>,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_builder(TestServerBuilder::new().without_rate_limit()).await
    }

    /// Harness whose store is wrapped in a call counter
    pub async fn with_builder(builder: TestServerBuilder) -> Self {
        Self::with_inner_store(builder, Arc::new(MemoryStore::new())).await
    }

    /// Harness counting calls into `inner`
    pub async fn with_inner_store(builder: TestServerBuilder, inner: Arc<dyn HealthStore>) -> Self {
        let store = Arc::new(CountingStore::new(inner));
        let server = builder
            .with_store(store.clone() as Arc<dyn HealthStore>)
            .build()
            .await;
        let app = server.create_app();

        Self { server, app, store }
    }

    /// Harness around a prebuilt server. Only calls made through `server.store`
    /// are counted.
    pub fn from_server(mut server: Server) -> Self {
        let store = Arc::new(CountingStore::new(server.store.clone()));
        server.store = store.clone();
        let app = server.create_app();

        Self { server, app, store }
    }

    pub async fn make_request(&self, request: Request<Body>) -> axum::response::Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Send a request and decode the JSON body
    pub async fn json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.make_request(request).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    /// POST a record for `user_id` and return the created body
    pub async fn create_record(
        &self,
        user_id: &str,
        timestamp: &str,
        steps: i64,
        calories: i64,
        sleep_hours: f64,
    ) -> Value {
        let (status, body) = self
            .json(RequestBuilder::create_health_data(
                user_id,
                serde_json::json!({
                    "timestamp": timestamp,
                    "steps": steps,
                    "calories": calories,
                    "sleepHours": sleep_hours,
                }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "unexpected body: {body}");
        body
    }
}

pub struct RequestBuilder;

impl RequestBuilder {
    pub fn health() -> Request<Body> {
        Request::builder().uri("/health").body(Body::empty()).unwrap()
    }

    pub fn create_health_data(user_id: &str, body: Value) -> Request<Body> {
        Self::create_health_data_with_key(user_id, body, Some(TEST_API_KEY))
    }

    pub fn create_health_data_with_key(
        user_id: &str,
        body: Value,
        api_key: Option<&str>,
    ) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(format!("/users/{user_id}/health-data"))
            .header("Content-Type", "application/json");
        if let Some(key) = api_key {
            builder = builder.header("X-API-KEY", key);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    pub fn list_health_data(user_id: &str, query: &str) -> Request<Body> {
        Self::get_with_key(
            &format!("/users/{user_id}/health-data?{query}"),
            Some(TEST_API_KEY),
        )
    }

    pub fn summary(user_id: &str, start: &str, end: &str) -> Request<Body> {
        Self::get_with_key(
            &format!("/users/{user_id}/summary?start={start}&end={end}"),
            Some(TEST_API_KEY),
        )
    }

    pub fn get_with_key(uri: &str, api_key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(key) = api_key {
            builder = builder.header("X-API-KEY", key);
        }
        builder.body(Body::empty()).unwrap()
    }
}
