//! Migration to create the devices table.
//!
//! Devices authenticate with a static API key. Both the hardware uid and the
//! key are unique; unbinding from a deleted motor keeps the device row.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Devices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Devices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Devices::DeviceUid).text().not_null())
                    .col(ColumnDef::new(Devices::ApiKey).text().not_null())
                    .col(ColumnDef::new(Devices::MotorId).integer().null())
                    .col(
                        ColumnDef::new(Devices::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Devices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Devices::LastSeen)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_devices_motor_id")
                            .from(Devices::Table, Devices::MotorId)
                            .to(Motors::Table, Motors::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_devices_device_uid")
                    .table(Devices::Table)
                    .col(Devices::DeviceUid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_devices_api_key")
                    .table(Devices::Table)
                    .col(Devices::ApiKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_devices_api_key").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_devices_device_uid").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Devices::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Devices {
    Table,
    Id,
    DeviceUid,
    ApiKey,
    MotorId,
    IsActive,
    CreatedAt,
    LastSeen,
}

#[derive(DeriveIden)]
enum Motors {
    Table,
    Id,
}
