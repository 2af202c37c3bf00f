use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use super::entities::health_records;
use super::migration::Migrator;
use super::{HealthStore, StoreConfig, StoreError, StoreResult};
use crate::models::{HealthRecord, NewHealthRecord};

/// SQL-backed store (SQLite or Postgres)
pub struct DatabaseStore {
    connection: DatabaseConnection,
}

impl DatabaseStore {
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let mut options = ConnectOptions::new(config.url.clone());
        // every pooled connection to an in-memory sqlite gets its own database
        let max_connections = if config.url.contains(":memory:") {
            1
        } else {
            config.max_connections
        };
        options.max_connections(max_connections).sqlx_logging(false);

        let connection = Database::connect(options)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { connection })
    }

    pub fn from_connection(connection: DatabaseConnection) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }
}

fn to_record(model: health_records::Model) -> StoreResult<HealthRecord> {
    let steps = u64::try_from(model.steps)
        .map_err(|_| StoreError::Constraint(format!("negative steps in record {}", model.id)))?;
    let calories = u64::try_from(model.calories)
        .map_err(|_| StoreError::Constraint(format!("negative calories in record {}", model.id)))?;

    Ok(HealthRecord {
        id: model.id,
        user_id: model.user_id,
        timestamp: model.timestamp,
        steps,
        calories,
        sleep_hours: model.sleep_hours,
    })
}

#[async_trait]
impl HealthStore for DatabaseStore {
    fn backend(&self) -> &'static str {
        "database"
    }

    async fn insert(&self, user_id: &str, record: NewHealthRecord) -> StoreResult<HealthRecord> {
        let steps = i64::try_from(record.steps)
            .map_err(|_| StoreError::Constraint(format!("steps out of range: {}", record.steps)))?;
        let calories = i64::try_from(record.calories).map_err(|_| {
            StoreError::Constraint(format!("calories out of range: {}", record.calories))
        })?;

        let active_model = health_records::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
            timestamp: Set(record.timestamp),
            steps: Set(steps),
            calories: Set(calories),
            sleep_hours: Set(record.sleep_hours),
        };

        let model = active_model
            .insert(&self.connection)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        to_record(model)
    }

    async fn find_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<HealthRecord>> {
        health_records::Entity::find()
            .filter(health_records::Column::UserId.eq(user_id))
            .filter(health_records::Column::Timestamp.gte(start))
            .filter(health_records::Column::Timestamp.lte(end))
            .all(&self.connection)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?
            .into_iter()
            .map(to_record)
            .collect()
    }

    async fn migrate(&self) -> StoreResult<()> {
        tracing::info!("Running database migrations");

        Migrator::up(&self.connection, None)
            .await
            .map_err(|e| StoreError::Migration(format!("Failed to run migrations: {}", e)))?;

        tracing::info!("Successfully completed all migrations");
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.connection
            .ping()
            .await
            .map_err(|e| StoreError::Database(format!("db error: {}", e)))
    }
}
