use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// "memory" for a process-local cache, "redis" to add the shared remote tier
    #[serde(default = "default_cache_backend")]
    pub backend: String,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_redis_key_prefix")]
    pub redis_key_prefix: String,
    /// Upper bound for establishing the redis connection, in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Lifetime of cached summary results, in seconds
    #[serde(default = "default_summary_ttl")]
    pub summary_ttl: u64,
}

fn default_cache_backend() -> String {
    "memory".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_key_prefix() -> String {
    "health_api:".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    2000
}

fn default_summary_ttl() -> u64 {
    300 // 5 minutes
}

impl CacheConfig {
    pub fn remote_enabled(&self) -> bool {
        self.backend.eq_ignore_ascii_case("redis")
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            redis_url: default_redis_url(),
            redis_key_prefix: default_redis_key_prefix(),
            connect_timeout_ms: default_connect_timeout_ms(),
            summary_ttl: default_summary_ttl(),
        }
    }
}
