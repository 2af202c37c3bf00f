//! Tiered read-through cache
//!
//! An optional shared remote tier (redis) sits in front of a process-local
//! tier. Callers never see remote failures: any remote error degrades the
//! operation to the local tier.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

pub mod config;
pub mod memory;
pub mod redis;

use crate::cache::config::CacheConfig;
use crate::cache::memory::MemoryCache;
use crate::health::{HealthCheckResult, HealthChecker};
use crate::metrics::track_cache_lookup;

/// Cache error types
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache error: {0}")]
    Cache(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Values that can be stored in the cache.
///
/// Implementors are converted to a plain JSON mapping before storage so the
/// cached representation is identical across tiers.
pub trait CachedObject: Serialize + DeserializeOwned + Send + Sync {
    fn to_cache_value(&self) -> CacheResult<Value> {
        serde_json::to_value(self).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn from_cache_value(value: Value) -> CacheResult<Self> {
        serde_json::from_value(value).map_err(|e| CacheError::Serialization(e.to_string()))
    }
}

impl CachedObject for Value {}

/// Shared remote tier contract
#[async_trait]
pub trait RemoteCache: Send + Sync {
    fn name(&self) -> &str;

    /// Connectivity probe
    async fn ping(&self) -> CacheResult<()>;

    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()>;

    async fn flush(&self) -> CacheResult<()>;
}

/// State of the remote tier once the lazy probe has run
enum RemoteState {
    Active(Arc<dyn RemoteCache>),
    /// The initial probe failed; stays disabled until restart
    Disabled,
}

pub struct TieredCache {
    local: MemoryCache,
    remote_candidate: Option<Arc<dyn RemoteCache>>,
    remote: OnceCell<RemoteState>,
}

impl TieredCache {
    /// Cache with only the process-local tier
    pub fn local_only() -> Self {
        Self {
            local: MemoryCache::new(),
            remote_candidate: None,
            remote: OnceCell::new(),
        }
    }

    /// Cache with a remote tier in front of the local one. The remote is
    /// probed on first use, not here.
    pub fn with_remote(remote: Arc<dyn RemoteCache>) -> Self {
        Self {
            local: MemoryCache::new(),
            remote_candidate: Some(remote),
            remote: OnceCell::new(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        if !config.remote_enabled() {
            return Self::local_only();
        }

        match redis::RedisCache::new(
            &config.redis_url,
            config.redis_key_prefix.clone(),
            Duration::from_millis(config.connect_timeout_ms),
        ) {
            Ok(redis) => Self::with_remote(Arc::new(redis)),
            Err(e) => {
                warn!(error = %e, "Invalid redis configuration, using local cache tier only");
                Self::local_only()
            }
        }
    }

    /// Resolve the remote tier, running the connectivity probe exactly once
    async fn remote(&self) -> Option<&Arc<dyn RemoteCache>> {
        let candidate = self.remote_candidate.as_ref()?;

        let state = self
            .remote
            .get_or_init(|| async move {
                match candidate.ping().await {
                    Ok(()) => {
                        info!(backend = candidate.name(), "Remote cache tier connected");
                        RemoteState::Active(candidate.clone())
                    }
                    Err(e) => {
                        warn!(
                            backend = candidate.name(),
                            error = %e,
                            "Remote cache tier unreachable, disabled until restart"
                        );
                        RemoteState::Disabled
                    }
                }
            })
            .await;

        match state {
            RemoteState::Active(remote) => Some(remote),
            RemoteState::Disabled => None,
        }
    }

    pub async fn get<T: CachedObject>(&self, key: &str) -> Option<T> {
        if let Some(remote) = self.remote().await {
            match remote.get(key).await {
                Ok(Some(payload)) => match serde_json::from_str::<Value>(&payload)
                    .map_err(|e| CacheError::Serialization(e.to_string()))
                    .and_then(T::from_cache_value)
                {
                    Ok(value) => {
                        track_cache_lookup("remote", true);
                        return Some(value);
                    }
                    Err(e) => warn!(key = %key, error = %e, "Undecodable remote cache entry"),
                },
                Ok(None) => track_cache_lookup("remote", false),
                Err(e) => debug!(key = %key, error = %e, "Remote cache get failed, using local tier"),
            }
        }

        let value = self.local.get(key).await;
        track_cache_lookup("local", value.is_some());

        match T::from_cache_value(value?) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Undecodable local cache entry");
                None
            }
        }
    }

    /// Store a value. Writes go to the remote tier when it accepts them and
    /// to the local tier otherwise, never both.
    pub async fn set<T: CachedObject>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> CacheResult<()> {
        let value = value.to_cache_value()?;

        if let Some(remote) = self.remote().await {
            let payload = serde_json::to_string(&value)
                .map_err(|e| CacheError::Serialization(e.to_string()))?;
            match remote.set_ex(key, &payload, ttl_seconds).await {
                Ok(()) => return Ok(()),
                Err(e) => debug!(key = %key, error = %e, "Remote cache set failed, using local tier"),
            }
        }

        self.local.set(key, value, ttl_seconds).await;
        Ok(())
    }

    pub async fn clear(&self) {
        if let Some(remote) = self.remote().await {
            if let Err(e) = remote.flush().await {
                debug!(error = %e, "Remote cache flush failed");
            }
        }
        self.local.clear().await;
    }

    /// Whether a remote tier was configured, regardless of its state
    pub fn remote_configured(&self) -> bool {
        self.remote_candidate.is_some()
    }

    /// Whether the remote tier passed its probe. Triggers the probe if it
    /// has not run yet.
    pub async fn remote_active(&self) -> bool {
        self.remote().await.is_some()
    }

    pub fn local(&self) -> &MemoryCache {
        &self.local
    }
}

#[async_trait]
impl HealthChecker for TieredCache {
    fn name(&self) -> &str {
        "cache"
    }

    async fn check(&self) -> HealthCheckResult {
        let local_entries = self.local.len().await;

        if !self.remote_configured() {
            return HealthCheckResult::healthy_with_details(serde_json::json!({
                "backend": "memory",
                "local_entries": local_entries
            }));
        }

        match self.remote().await {
            Some(remote) => match remote.ping().await {
                Ok(()) => HealthCheckResult::healthy_with_details(serde_json::json!({
                    "backend": remote.name(),
                    "remote": "active",
                    "local_entries": local_entries
                })),
                Err(err) => HealthCheckResult::degraded_with_details(
                    "Remote cache tier not responding, serving from local tier".to_string(),
                    serde_json::json!({
                        "backend": remote.name(),
                        "remote": "unreachable",
                        "error": err.to_string(),
                        "local_entries": local_entries
                    }),
                ),
            },
            None => HealthCheckResult::degraded_with_details(
                "Remote cache tier disabled after failed probe".to_string(),
                serde_json::json!({
                    "remote": "disabled",
                    "local_entries": local_entries
                }),
            ),
        }
    }

    fn info(&self) -> Option<Value> {
        Some(serde_json::json!({
            "service": "Tiered Cache",
            "remote_configured": self.remote_configured()
        }))
    }
}
