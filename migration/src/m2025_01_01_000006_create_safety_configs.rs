//! Migration to create the safety_configs table (one row per motor).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SafetyConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SafetyConfigs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SafetyConfigs::MotorId).integer().not_null())
                    .col(
                        ColumnDef::new(SafetyConfigs::MaxTemperature)
                            .double()
                            .not_null()
                            .default(80.0),
                    )
                    .col(
                        ColumnDef::new(SafetyConfigs::MaxVibration)
                            .double()
                            .not_null()
                            .default(5.0),
                    )
                    .col(
                        ColumnDef::new(SafetyConfigs::MinBatteryPercent)
                            .double()
                            .not_null()
                            .default(20.0),
                    )
                    .col(
                        ColumnDef::new(SafetyConfigs::EmergencyStopDelaySeconds)
                            .integer()
                            .not_null()
                            .default(5),
                    )
                    .col(
                        ColumnDef::new(SafetyConfigs::EnableSmsAlerts)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(SafetyConfigs::SmsPhoneNumber).text().null())
                    .col(
                        ColumnDef::new(SafetyConfigs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SafetyConfigs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_safety_configs_motor_id")
                            .from(SafetyConfigs::Table, SafetyConfigs::MotorId)
                            .to(Motors::Table, Motors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_safety_configs_motor_id")
                    .table(SafetyConfigs::Table)
                    .col(SafetyConfigs::MotorId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_safety_configs_motor_id").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SafetyConfigs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SafetyConfigs {
    Table,
    Id,
    MotorId,
    MaxTemperature,
    MaxVibration,
    MinBatteryPercent,
    EmergencyStopDelaySeconds,
    EnableSmsAlerts,
    SmsPhoneNumber,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Motors {
    Table,
    Id,
}
