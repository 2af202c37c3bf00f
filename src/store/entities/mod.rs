pub mod health_records;

pub use health_records::Entity as HealthRecords;
