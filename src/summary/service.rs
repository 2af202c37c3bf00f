use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use super::SummaryError;
use super::aggregator::{DateRange, DateRangeAggregator};
use crate::cache::{CachedObject, TieredCache};
use crate::metrics::track_summary_computed;
use crate::store::HealthStore;

/// Aggregate over a user's records. `start_date` and `end_date` echo the
/// request strings verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    pub user_id: String,
    pub start_date: String,
    pub end_date: String,
    pub total_steps: u64,
    pub average_calories: f64,
    pub average_sleep_hours: f64,
}

impl CachedObject for SummaryResult {}

/// Built from the raw request strings, so `08-01-2026` and `8-1-2026` are
/// distinct entries
pub fn summary_cache_key(user_id: &str, start: &str, end: &str) -> String {
    format!("summary:{user_id}:{start}:{end}")
}

pub struct SummaryService {
    cache: Arc<TieredCache>,
    aggregator: DateRangeAggregator,
    ttl_seconds: u64,
}

impl SummaryService {
    pub fn new(cache: Arc<TieredCache>, store: Arc<dyn HealthStore>, ttl_seconds: u64) -> Self {
        Self {
            cache,
            aggregator: DateRangeAggregator::new(store),
            ttl_seconds,
        }
    }

    pub fn aggregator(&self) -> &DateRangeAggregator {
        &self.aggregator
    }

    /// Read-through summary: a hit returns the cached result without
    /// touching the store, a miss parses the dates, runs one store query
    /// and caches the result.
    pub async fn get_summary(
        &self,
        user_id: &str,
        start: &str,
        end: &str,
    ) -> Result<SummaryResult, SummaryError> {
        let key = summary_cache_key(user_id, start, end);

        if let Some(cached) = self.cache.get::<SummaryResult>(&key).await {
            debug!(key = %key, "Summary served from cache");
            return Ok(cached);
        }

        let range = DateRange::parse(start, end)?;
        let aggregate = self.aggregator.aggregate(user_id, &range).await?;
        track_summary_computed(aggregate.count);

        let result = SummaryResult {
            user_id: user_id.to_string(),
            start_date: start.to_string(),
            end_date: end.to_string(),
            total_steps: aggregate.total_steps,
            average_calories: aggregate.average_calories(),
            average_sleep_hours: aggregate.average_sleep_hours(),
        };

        if let Err(e) = self.cache.set(&key, &result, self.ttl_seconds).await {
            warn!(key = %key, error = %e, "Failed to cache summary");
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewHealthRecord;
    use crate::store::MemoryStore;
    use crate::test_utils::CountingStore;

    async fn seeded_store() -> Arc<CountingStore> {
        let store = Arc::new(CountingStore::new(Arc::new(MemoryStore::new())));
        for (timestamp, steps, calories, sleep_hours) in [
            ("2026-01-08T08:30:00Z", 1200, 450, 7.5),
            ("2026-01-08T21:00:00Z", 1500, 500, 8.0),
        ] {
            store
                .insert(
                    "user123",
                    NewHealthRecord {
                        timestamp: timestamp.parse().unwrap(),
                        steps,
                        calories,
                        sleep_hours,
                    },
                )
                .await
                .unwrap();
        }
        store
    }

    fn service(store: Arc<CountingStore>) -> (SummaryService, Arc<TieredCache>) {
        let cache = Arc::new(TieredCache::local_only());
        (SummaryService::new(cache.clone(), store, 300), cache)
    }

    #[tokio::test]
    async fn test_summary_example_values() {
        let store = seeded_store().await;
        let (service, _) = service(store);

        let summary = service
            .get_summary("user123", "08-01-2026", "08-01-2026")
            .await
            .unwrap();

        assert_eq!(
            summary,
            SummaryResult {
                user_id: "user123".to_string(),
                start_date: "08-01-2026".to_string(),
                end_date: "08-01-2026".to_string(),
                total_steps: 2700,
                average_calories: 475.0,
                average_sleep_hours: 7.75,
            }
        );
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let store = seeded_store().await;
        let (service, _) = service(store.clone());

        let first = service.get_summary("user123", "08-01-2026", "09-01-2026").await.unwrap();
        let second = service.get_summary("user123", "08-01-2026", "09-01-2026").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.find_calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_ignores_new_records_until_expiry() {
        let store = seeded_store().await;
        let (service, _) = service(store.clone());

        let before = service.get_summary("user123", "08-01-2026", "08-01-2026").await.unwrap();
        store
            .insert(
                "user123",
                NewHealthRecord {
                    timestamp: "2026-01-08T22:00:00Z".parse().unwrap(),
                    steps: 10_000,
                    calories: 100,
                    sleep_hours: 1.0,
                },
            )
            .await
            .unwrap();
        let after = service.get_summary("user123", "08-01-2026", "08-01-2026").await.unwrap();

        assert_eq!(before.total_steps, after.total_steps);
    }

    #[tokio::test]
    async fn test_invalid_date_skips_store_and_cache() {
        let store = seeded_store().await;
        let (service, cache) = service(store.clone());

        for (start, end) in [("2026-01-01", "08-01-2026"), ("08-01-2026", "2026-01-01")] {
            let err = service.get_summary("user123", start, end).await.unwrap_err();
            let message = err.to_string();
            assert!(message.contains("Invalid date format"));
            assert!(message.contains("2026-01-01"));
        }

        assert_eq!(store.find_calls(), 0);
        assert!(cache.local().is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_range() {
        let store = seeded_store().await;
        let (service, _) = service(store);

        let summary = service.get_summary("user123", "01-02-2026", "28-02-2026").await.unwrap();

        assert_eq!(summary.total_steps, 0);
        assert_eq!(summary.average_calories, 0.0);
        assert_eq!(summary.average_sleep_hours, 0.0);
    }

    #[tokio::test]
    async fn test_cached_entry_is_returned_without_parsing() {
        let store = seeded_store().await;
        let (service, cache) = service(store.clone());

        let planted = SummaryResult {
            user_id: "user123".to_string(),
            start_date: "not-a-date".to_string(),
            end_date: "08-01-2026".to_string(),
            total_steps: 42,
            average_calories: 1.0,
            average_sleep_hours: 2.0,
        };
        cache
            .set(&summary_cache_key("user123", "not-a-date", "08-01-2026"), &planted, 300)
            .await
            .unwrap();

        let summary = service.get_summary("user123", "not-a-date", "08-01-2026").await.unwrap();
        assert_eq!(summary, planted);
        assert_eq!(store.find_calls(), 0);
    }

    #[test]
    fn test_cache_key_uses_raw_strings() {
        assert_eq!(
            summary_cache_key("user123", "08-01-2026", "09-01-2026"),
            "summary:user123:08-01-2026:09-01-2026"
        );
        assert_ne!(
            summary_cache_key("user123", "08-01-2026", "09-01-2026"),
            summary_cache_key("user123", "8-1-2026", "9-1-2026")
        );
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let value = SummaryResult {
            user_id: "u".to_string(),
            start_date: "08-01-2026".to_string(),
            end_date: "08-01-2026".to_string(),
            total_steps: 1,
            average_calories: 2.0,
            average_sleep_hours: 3.0,
        }
        .to_cache_value()
        .unwrap();

        assert_eq!(value["userId"], "u");
        assert_eq!(value["totalSteps"], 1);
        assert_eq!(value["averageSleepHours"], 3.0);
    }
}
