pub mod cache;
pub mod migrate;

use crate::Config;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Run store migrations
    Migrate {
        #[command(subcommand)]
        action: Option<migrate::MigrateAction>,
    },
    /// Flush both cache tiers
    ClearCache,
}

/// Run a one-shot command. `Serve` is handled by the binary.
pub async fn handle_command(
    command: Commands,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Serve => Ok(()),
        Commands::Migrate { action } => {
            migrate::handle_migrate_command(action.unwrap_or(migrate::MigrateAction::Up), config)
                .await
        }
        Commands::ClearCache => cache::handle_clear_cache_command(config).await,
    }
}
