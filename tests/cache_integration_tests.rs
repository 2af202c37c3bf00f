mod common;

use axum::http::StatusCode;
use common::{RequestBuilder, TestHarness};
use health_metrics_api::cache::{TieredCache, config::CacheConfig};
use health_metrics_api::test_utils::TestServerBuilder;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

fn unreachable_redis_config() -> CacheConfig {
    CacheConfig {
        backend: "redis".to_string(),
        redis_url: "redis://127.0.0.1:1".to_string(),
        connect_timeout_ms: 200,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_ttl_expiry() {
    let cache = TieredCache::local_only();
    cache.set("k", &json!({"a": 1}), 1).await.unwrap();
    assert_eq!(cache.get::<Value>("k").await, Some(json!({"a": 1})));

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(cache.get::<Value>("k").await, None);
}

#[tokio::test]
async fn test_unreachable_redis_degrades_to_local() {
    let cache = TieredCache::from_config(&unreachable_redis_config());
    assert!(cache.remote_configured());

    cache.set("k", &json!({"a": 1}), 60).await.unwrap();
    assert_eq!(cache.get::<Value>("k").await, Some(json!({"a": 1})));
    assert!(!cache.remote_active().await);
    assert_eq!(cache.local().len().await, 1);
}

#[tokio::test]
async fn test_summary_served_with_unreachable_redis() {
    let cache = Arc::new(TieredCache::from_config(&unreachable_redis_config()));
    let harness = TestHarness::with_builder(
        TestServerBuilder::new()
            .without_rate_limit()
            .with_cache(cache),
    )
    .await;
    harness
        .create_record("user123", "2026-01-08T08:30:00Z", 1200, 450, 7.5)
        .await;

    for _ in 0..2 {
        let (status, body) = harness
            .json(RequestBuilder::summary("user123", "08-01-2026", "08-01-2026"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalSteps"], 1200);
    }
    assert_eq!(harness.store.find_calls(), 1);

    let (status, body) = harness
        .json(RequestBuilder::get_with_key("/health/components?check=cache", None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["cache"]["status"], "degraded");
}
