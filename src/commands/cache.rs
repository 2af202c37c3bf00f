use crate::Config;
use crate::cache::TieredCache;
use tracing::info;

/// Flush the remote tier (best effort) and the local tier
pub async fn handle_clear_cache_command(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let cache = TieredCache::from_config(&config.cache);

    if cache.remote_configured() && !cache.remote_active().await {
        info!("Remote cache tier unreachable; nothing to flush remotely");
    }

    cache.clear().await;
    info!("Cache cleared");
    Ok(())
}
