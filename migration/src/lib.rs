//! Database migrations for the MotorGuard API.
//!
//! One migration per table, applied in dependency order.

pub use sea_orm_migration::prelude::*;

mod m2025_01_01_000001_create_users;
mod m2025_01_01_000002_create_motors;
mod m2025_01_01_000003_create_telemetry;
mod m2025_01_01_000004_create_maintenance_tasks;
mod m2025_01_01_000005_create_maintenance_reports;
mod m2025_01_01_000006_create_safety_configs;
mod m2025_01_01_000007_create_devices;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_01_000001_create_users::Migration),
            Box::new(m2025_01_01_000002_create_motors::Migration),
            Box::new(m2025_01_01_000003_create_telemetry::Migration),
            Box::new(m2025_01_01_000004_create_maintenance_tasks::Migration),
            Box::new(m2025_01_01_000005_create_maintenance_reports::Migration),
            Box::new(m2025_01_01_000006_create_safety_configs::Migration),
            Box::new(m2025_01_01_000007_create_devices::Migration),
        ]
    }
}
