use sea_orm_migration::prelude::*;

pub use sea_orm_migration::MigratorTrait;

mod m20260108_000001_create_health_records_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(
            m20260108_000001_create_health_records_table::Migration,
        )]
    }
}

#[derive(Iden)]
pub enum HealthRecords {
    Table,
    Id,
    UserId,
    Timestamp,
    Steps,
    Calories,
    SleepHours,
}
