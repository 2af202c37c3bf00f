//! Health record storage
//!
//! The store is the ground truth for every read; its failures surface to the
//! caller as server errors. Two backends are available: a SQL database through
//! sea-orm and a process-local map.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::health::{HealthCheckResult, HealthChecker};
use crate::models::{HealthRecord, NewHealthRecord};

pub mod config;
pub mod database;
pub mod entities;
pub mod memory;
pub mod migration;

pub use config::StoreConfig;
pub use database::DatabaseStore;
pub use memory::MemoryStore;

/// Store error types
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Constraint violation: {0}")]
    Constraint(String),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Unsupported store backend: {0}")]
    UnsupportedBackend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait HealthStore: Send + Sync {
    /// Backend name reported by health checks
    fn backend(&self) -> &'static str;

    /// Persist a record under `user_id`, returning it with its generated id
    async fn insert(&self, user_id: &str, record: NewHealthRecord) -> StoreResult<HealthRecord>;

    /// Every record for `user_id` with `start <= timestamp <= end`, in no
    /// particular order
    async fn find_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<HealthRecord>>;

    async fn migrate(&self) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<()>;
}

/// Build the store selected by `config.backend`
pub async fn from_config(config: &StoreConfig) -> StoreResult<Arc<dyn HealthStore>> {
    match config.backend.to_ascii_lowercase().as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "database" => Ok(Arc::new(DatabaseStore::connect(config).await?)),
        other => Err(StoreError::UnsupportedBackend(other.to_string())),
    }
}

/// Adapts a store to the component health registry
pub struct StoreHealthChecker {
    store: Arc<dyn HealthStore>,
}

impl StoreHealthChecker {
    pub fn new(store: Arc<dyn HealthStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HealthChecker for StoreHealthChecker {
    fn name(&self) -> &str {
        "store"
    }

    async fn check(&self) -> HealthCheckResult {
        match self.store.health_check().await {
            Ok(()) => HealthCheckResult::healthy_with_details(serde_json::json!({
                "backend": self.store.backend(),
                "connection": "ok"
            })),
            Err(err) => HealthCheckResult::unhealthy(format!("Store health check failed: {}", err)),
        }
    }

    fn info(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({ "backend": self.store.backend() }))
    }
}
