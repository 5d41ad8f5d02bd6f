//! Migration to create the telemetry table.
//!
//! Append-only readings per motor, removed together with their motor.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Telemetry::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Telemetry::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Telemetry::MotorId).integer().not_null())
                    .col(ColumnDef::new(Telemetry::Temperature).double().not_null())
                    .col(ColumnDef::new(Telemetry::Vibration).double().not_null())
                    .col(ColumnDef::new(Telemetry::Current).double().not_null())
                    .col(ColumnDef::new(Telemetry::SpeedRpm).double().not_null())
                    .col(ColumnDef::new(Telemetry::IsRunning).boolean().not_null())
                    .col(ColumnDef::new(Telemetry::BatteryPercent).double().null())
                    .col(
                        ColumnDef::new(Telemetry::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_telemetry_motor_id")
                            .from(Telemetry::Table, Telemetry::MotorId)
                            .to(Motors::Table, Motors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // History reads filter by motor and sort by time
        manager
            .create_index(
                Index::create()
                    .name("idx_telemetry_motor_created_at")
                    .table(Telemetry::Table)
                    .col(Telemetry::MotorId)
                    .col(Telemetry::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_telemetry_motor_created_at")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Telemetry::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Telemetry {
    Table,
    Id,
    MotorId,
    Temperature,
    Vibration,
    Current,
    SpeedRpm,
    IsRunning,
    BatteryPercent,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Motors {
    Table,
    Id,
}
