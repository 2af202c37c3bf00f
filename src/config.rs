use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use crate::auth::config::AuthConfig;
pub use crate::cache::config::CacheConfig;
pub use crate::server::config::{LoggingConfig, MetricsConfig, RateLimitConfig, ServerConfig};
pub use crate::store::config::StoreConfig;

const ENV_PREFIX: &str = "HEALTH_API";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Defaults, then `config.yaml` in the working directory if present,
    /// then `HEALTH_API_*` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder =
            ConfigBuilder::builder().add_source(config::Config::try_from(&Config::default())?);

        if Path::new("config.yaml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder.add_source(env_source());

        builder.build()?.try_deserialize()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut builder =
            ConfigBuilder::builder().add_source(config::Config::try_from(&Config::default())?);

        if path.as_ref().exists() {
            builder = builder.add_source(File::from(path.as_ref()));
        }

        builder = builder.add_source(env_source());

        builder.build()?.try_deserialize()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.auth.api_key, "default-dev-key");
        assert_eq!(config.cache.backend, "memory");
        assert_eq!(config.cache.summary_ttl, 300);
        assert_eq!(config.store.backend, "database");
        assert_eq!(config.rate_limit.requests_per_minute, 60);
        assert!(!config.rate_limit.trust_proxy_headers);
        assert_eq!(config.logging.level, "info");
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_config_load_from_yaml_file() {
        let yaml_content = r#"
server:
  host: "127.0.0.1"
  port: 4000
auth:
  api_key: "file-secret"
cache:
  backend: "redis"
  redis_url: "redis://cache:6379"
  summary_ttl: 60
store:
  backend: "memory"
rate_limit:
  trust_proxy_headers: true
logging:
  level: "warn"
"#;

        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();

        let config = Config::load_from_file(temp_file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.auth.api_key, "file-secret");
        assert!(config.cache.remote_enabled());
        assert_eq!(config.cache.redis_url, "redis://cache:6379");
        assert_eq!(config.cache.summary_ttl, 60);
        assert_eq!(config.store.backend, "memory");
        assert_eq!(config.logging.level, "warn");
        assert!(config.rate_limit.trust_proxy_headers);
        // untouched fields keep their defaults
        assert_eq!(config.rate_limit.requests_per_minute, 60);
        assert_eq!(config.cache.redis_key_prefix, "health_api:");
    }

    #[test]
    #[serial]
    fn test_config_env_overrides_file() {
        let yaml_content = r#"
auth:
  api_key: "file-secret"
"#;
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();

        // SAFETY: serialized with every other test that touches the environment
        unsafe {
            std::env::set_var("HEALTH_API_AUTH__API_KEY", "env-secret");
        }
        let config = Config::load_from_file(temp_file.path());
        unsafe {
            std::env::remove_var("HEALTH_API_AUTH__API_KEY");
        }

        assert_eq!(config.unwrap().auth.api_key, "env-secret");
    }

    #[test]
    #[serial]
    fn test_config_load_nonexistent_file() {
        let config = Config::load_from_file("nonexistent.yaml").unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
    }
}
