//! Service liveness and component health reporting
//!
//! Components (the record store, the cache tiers) register a [`HealthChecker`];
//! `/health/components` runs them and reports the worst status.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl HealthCheckResult {
    fn with_status(status: HealthStatus, message: Option<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            status,
            message,
            details,
            duration_ms: None,
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(HealthStatus::Healthy, None, None)
    }

    pub fn healthy_with_details(details: serde_json::Value) -> Self {
        Self::with_status(HealthStatus::Healthy, None, Some(details))
    }

    pub fn degraded_with_details(message: String, details: serde_json::Value) -> Self {
        Self::with_status(HealthStatus::Degraded, Some(message), Some(details))
    }

    pub fn unhealthy(message: String) -> Self {
        Self::with_status(HealthStatus::Unhealthy, Some(message), None)
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// Component name, also used as the `check` query filter
    fn name(&self) -> &str;

    async fn check(&self) -> HealthCheckResult;

    /// Static information about this component
    fn info(&self) -> Option<serde_json::Value> {
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealthResponse {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    pub checks: BTreeMap<String, HealthCheckResult>,
}

pub struct HealthService {
    checkers: RwLock<Vec<Arc<dyn HealthChecker>>>,
}

impl HealthService {
    pub fn new() -> Self {
        Self {
            checkers: RwLock::new(Vec::new()),
        }
    }

    /// Register a component; a checker with the same name is replaced
    pub async fn register(&self, checker: Arc<dyn HealthChecker>) {
        let mut checkers = self.checkers.write().await;
        checkers.retain(|existing| existing.name() != checker.name());
        checkers.push(checker);
    }

    pub async fn registered(&self) -> Vec<String> {
        let checkers = self.checkers.read().await;
        checkers.iter().map(|c| c.name().to_string()).collect()
    }

    /// Run every registered check, or only the one named by `filter`
    pub async fn check_components(&self, filter: Option<&str>) -> ComponentHealthResponse {
        let checkers = self.checkers.read().await;
        let mut checks = BTreeMap::new();

        for checker in checkers
            .iter()
            .filter(|c| filter.is_none_or(|name| name == "all" || name == c.name()))
        {
            let start = Instant::now();
            let result = checker.check().await;
            let duration = start.elapsed().as_millis() as u64;
            checks.insert(checker.name().to_string(), result.with_duration(duration));
        }

        let status = checks
            .values()
            .map(|r| r.status)
            .fold(HealthStatus::Healthy, |worst, status| match (worst, status) {
                (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => {
                    HealthStatus::Unhealthy
                }
                (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
                _ => HealthStatus::Healthy,
            });

        ComponentHealthResponse {
            status,
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            checks,
        }
    }
}

impl Default for HealthService {
    fn default() -> Self {
        Self::new()
    }
}
