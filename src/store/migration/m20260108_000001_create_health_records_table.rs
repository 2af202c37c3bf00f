use super::HealthRecords;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(HealthRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HealthRecords::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(HealthRecords::UserId).string().not_null())
                    .col(
                        ColumnDef::new(HealthRecords::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(HealthRecords::Steps).big_integer().not_null())
                    .col(
                        ColumnDef::new(HealthRecords::Calories)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(HealthRecords::SleepHours).double().not_null())
                    .to_owned(),
            )
            .await?;

        // Range queries always filter by user first, then by time
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_health_records_user_time")
                    .table(HealthRecords::Table)
                    .col(HealthRecords::UserId)
                    .col(HealthRecords::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(HealthRecords::Table).to_owned())
            .await
    }
}
