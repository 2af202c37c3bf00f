use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Cache entry holding an owned plain-JSON value and its absolute expiry
#[derive(Clone, Debug)]
struct CacheEntry {
    value: Value,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(value: Value, ttl_seconds: u64) -> Self {
        let expires_at = i64::try_from(ttl_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { value, expires_at }
    }

    /// An entry is only visible while `now < expires_at`
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Process-local cache tier. Expired entries are purged lazily on access;
/// there is no background sweep.
#[derive(Default)]
pub struct MemoryCache {
    store: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let now = Utc::now();
        {
            let store = self.store.read().await;
            match store.get(key) {
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Re-check under the write lock, a concurrent set may have refreshed the entry
        let mut store = self.store.write().await;
        match store.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => {
                store.remove(key);
                None
            }
            None => None,
        }
    }

    pub async fn set(&self, key: &str, value: Value, ttl_seconds: u64) {
        let entry = CacheEntry::new(value, ttl_seconds);
        let mut store = self.store.write().await;
        store.insert(key.to_string(), entry);
    }

    pub async fn clear(&self) {
        let mut store = self.store.write().await;
        store.clear();
    }

    /// Number of stored entries, including expired ones not yet purged
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_memory_cache_basic_operations() {
        let cache = MemoryCache::new();

        cache.set("key1", json!({"steps": 1200}), 60).await;
        assert_eq!(cache.get("key1").await, Some(json!({"steps": 1200})));
        assert_eq!(cache.get("missing").await, None);

        // Overwrite replaces the previous value
        cache.set("key1", json!({"steps": 1500}), 60).await;
        assert_eq!(cache.get("key1").await, Some(json!({"steps": 1500})));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_cache_expiration() {
        let cache = MemoryCache::new();

        cache.set("short", json!("value"), 1).await;
        assert_eq!(cache.get("short").await, Some(json!("value")));

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(cache.get("short").await, None);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_never_visible() {
        let cache = MemoryCache::new();

        cache.set("gone", json!(1), 0).await;
        assert_eq!(cache.get("gone").await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_purged_on_access() {
        let cache = MemoryCache::new();

        cache.set("stale", json!(1), 0).await;
        cache.set("fresh", json!(2), 60).await;
        assert_eq!(cache.len().await, 2);

        // Nothing is removed until the expired key is looked up
        assert_eq!(cache.get("fresh").await, Some(json!(2)));
        assert_eq!(cache.len().await, 2);

        assert_eq!(cache.get("stale").await, None);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_huge_ttl_does_not_overflow() {
        let cache = MemoryCache::new();

        cache.set("forever", json!(true), u64::MAX).await;
        assert_eq!(cache.get("forever").await, Some(json!(true)));
    }

    #[tokio::test]
    async fn test_memory_cache_clear() {
        let cache = MemoryCache::new();

        cache.set("key1", json!("value1"), 60).await;
        cache.set("key2", json!("value2"), 60).await;

        cache.clear().await;

        assert!(cache.is_empty().await);
        assert_eq!(cache.get("key1").await, None);
        assert_eq!(cache.get("key2").await, None);
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        let cache = Arc::new(MemoryCache::new());

        let mut handles = Vec::new();
        for i in 0..32 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let key = format!("key{}", i % 8);
                cache.set(&key, json!(i), 60).await;
                cache.get(&key).await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }
        assert_eq!(cache.len().await, 8);
    }
}
