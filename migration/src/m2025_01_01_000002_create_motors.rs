//! Migration to create the motors table.
//!
//! The `last_*` columns hold a denormalized copy of the newest telemetry row.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Motors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Motors::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Motors::Name).text().not_null())
                    .col(ColumnDef::new(Motors::Code).text().not_null())
                    .col(ColumnDef::new(Motors::Location).text().null())
                    .col(ColumnDef::new(Motors::Description).text().null())
                    .col(ColumnDef::new(Motors::DeviceUid).text().null())
                    .col(
                        ColumnDef::new(Motors::IsRunning)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Motors::LastTemperature).double().null())
                    .col(ColumnDef::new(Motors::LastVibration).double().null())
                    .col(ColumnDef::new(Motors::LastCurrent).double().null())
                    .col(ColumnDef::new(Motors::LastSpeedRpm).double().null())
                    .col(ColumnDef::new(Motors::LastBatteryPercent).double().null())
                    .col(
                        ColumnDef::new(Motors::LastUpdate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_motors_code")
                    .table(Motors::Table)
                    .col(Motors::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_motors_device_uid")
                    .table(Motors::Table)
                    .col(Motors::DeviceUid)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_motors_device_uid").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_motors_code").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Motors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Motors {
    Table,
    Id,
    Name,
    Code,
    Location,
    Description,
    DeviceUid,
    IsRunning,
    LastTemperature,
    LastVibration,
    LastCurrent,
    LastSpeedRpm,
    LastBatteryPercent,
    LastUpdate,
}
