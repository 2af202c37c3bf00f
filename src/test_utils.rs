use crate::{
    cache::TieredCache,
    config::Config,
    models::{HealthRecord, NewHealthRecord},
    server::Server,
    store::{HealthStore, MemoryStore, StoreResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

/// API key configured by [`TestServerBuilder`] unless overridden
pub const TEST_API_KEY: &str = "test-api-key";

/// Test server builder with in-process backends by default
pub struct TestServerBuilder {
    config: Config,
    store: Option<Arc<dyn HealthStore>>,
    cache: Option<Arc<TieredCache>>,
    use_database: bool,
}

impl TestServerBuilder {
    pub fn new() -> Self {
        let mut config = Config::default();
        config.auth.api_key = TEST_API_KEY.to_string();
        config.metrics.enabled = false;
        config.logging.log_request = false;

        Self {
            config,
            store: None,
            cache: None,
            use_database: false,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.config.auth.api_key = api_key.to_string();
        self
    }

    pub fn with_rate_limit(mut self, requests_per_minute: u32) -> Self {
        self.config.rate_limit.enabled = true;
        self.config.rate_limit.requests_per_minute = requests_per_minute;
        self
    }

    /// Key the rate limiter on `X-Real-IP`/`X-Forwarded-For`
    pub fn with_trusted_proxy_headers(mut self) -> Self {
        self.config.rate_limit.trust_proxy_headers = true;
        self
    }

    pub fn without_rate_limit(mut self) -> Self {
        self.config.rate_limit.enabled = false;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn HealthStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_cache(mut self, cache: Arc<TieredCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use the SQL store on an in-memory SQLite database
    pub fn with_database(mut self) -> Self {
        self.use_database = true;
        self
    }

    pub async fn build(self) -> Server {
        let mut config = self.config;
        config.metrics.enabled = false;

        let store = match self.store {
            Some(store) => store,
            None if self.use_database => {
                config.store.backend = "database".to_string();
                config.store.url = "sqlite::memory:".to_string();
                crate::store::from_config(&config.store).await.unwrap()
            }
            None => {
                config.store.backend = "memory".to_string();
                Arc::new(MemoryStore::new())
            }
        };
        store.migrate().await.unwrap();

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(TieredCache::local_only()));

        Server::with_components(config, store, cache).await
    }
}

impl Default for TestServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Store wrapper that counts calls, for asserting cache behaviour
pub struct CountingStore {
    inner: Arc<dyn HealthStore>,
    inserts: AtomicUsize,
    finds: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn HealthStore>) -> Self {
        Self {
            inner,
            inserts: AtomicUsize::new(0),
            finds: AtomicUsize::new(0),
        }
    }

    pub fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn find_calls(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthStore for CountingStore {
    fn backend(&self) -> &'static str {
        self.inner.backend()
    }

    async fn insert(&self, user_id: &str, record: NewHealthRecord) -> StoreResult<HealthRecord> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(user_id, record).await
    }

    async fn find_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<HealthRecord>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find_in_range(user_id, start, end).await
    }

    async fn migrate(&self) -> StoreResult<()> {
        self.inner.migrate().await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }
}
