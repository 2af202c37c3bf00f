use crate::Config;
use crate::store::DatabaseStore;
use crate::store::migration::Migrator;
use clap::Subcommand;
use sea_orm_migration::MigratorTrait;
use tracing::info;

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrateAction {
    /// Run all pending migrations
    Up,
    /// Rollback the last migration
    Down {
        #[arg(
            short,
            long,
            help = "Number of migrations to rollback",
            default_value = "1"
        )]
        steps: u32,
    },
    /// Show migration status
    Status,
}

pub async fn handle_migrate_command(
    action: MigrateAction,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    if !config.store.backend.eq_ignore_ascii_case("database") {
        return Err(format!(
            "Migrations apply to the database store only (configured backend: {})",
            config.store.backend
        )
        .into());
    }

    let store = DatabaseStore::connect(&config.store).await?;
    let connection = store.connection();

    match action {
        MigrateAction::Up => {
            info!("Running pending migrations...");
            Migrator::up(connection, None).await?;
            info!("All migrations completed successfully");
        }
        MigrateAction::Down { steps } => {
            info!("Rolling back {} migration(s)...", steps);
            Migrator::down(connection, Some(steps)).await?;
            info!("Rollback completed successfully");
        }
        MigrateAction::Status => {
            info!("Checking migration status...");
            Migrator::status(connection).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_config(path: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.store.url = format!("sqlite://{}?mode=rwc", path.display());
        config
    }

    #[tokio::test]
    async fn test_migrate_up_status_down() {
        let dir = tempfile::tempdir().unwrap();
        let config = sqlite_config(&dir.path().join("health.db"));

        handle_migrate_command(MigrateAction::Up, &config).await.unwrap();
        handle_migrate_command(MigrateAction::Status, &config).await.unwrap();
        handle_migrate_command(MigrateAction::Down { steps: 1 }, &config)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_migrate_rejects_memory_store() {
        let mut config = Config::default();
        config.store.backend = "memory".to_string();

        let err = handle_migrate_command(MigrateAction::Up, &config)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("database store only"));
    }
}
