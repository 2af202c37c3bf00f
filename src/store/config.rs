use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "database" for the SQL store, "memory" for a process-local map
    #[serde(default = "default_store_backend")]
    pub backend: String,
    #[serde(default = "default_store_url")]
    pub url: String,
    #[serde(default = "default_store_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_migration_on_startup")]
    pub migration_on_startup: bool,
}

fn default_store_backend() -> String {
    "database".to_string()
}

fn default_store_url() -> String {
    "sqlite://health_metrics.db?mode=rwc".to_string()
}

fn default_store_max_connections() -> u32 {
    5
}

fn default_migration_on_startup() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            url: default_store_url(),
            max_connections: default_store_max_connections(),
            migration_on_startup: default_migration_on_startup(),
        }
    }
}
