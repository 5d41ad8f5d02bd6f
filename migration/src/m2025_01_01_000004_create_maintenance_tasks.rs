//! Migration to create the maintenance_tasks table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MaintenanceTasks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MaintenanceTasks::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceTasks::MotorId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceTasks::AssignedToUserId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceTasks::CreatedByUserId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MaintenanceTasks::Title).text().not_null())
                    .col(ColumnDef::new(MaintenanceTasks::Description).text().null())
                    .col(
                        ColumnDef::new(MaintenanceTasks::ScheduledDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceTasks::Status)
                            .text()
                            .not_null()
                            .default("PLANNED"),
                    )
                    .col(
                        ColumnDef::new(MaintenanceTasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(MaintenanceTasks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_maintenance_tasks_motor_id")
                            .from(MaintenanceTasks::Table, MaintenanceTasks::MotorId)
                            .to(Motors::Table, Motors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_maintenance_tasks_assigned_to")
                            .from(MaintenanceTasks::Table, MaintenanceTasks::AssignedToUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_maintenance_tasks_created_by")
                            .from(MaintenanceTasks::Table, MaintenanceTasks::CreatedByUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Technician task lists are always filtered by assignee
        manager
            .create_index(
                Index::create()
                    .name("idx_maintenance_tasks_assigned_to")
                    .table(MaintenanceTasks::Table)
                    .col(MaintenanceTasks::AssignedToUserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_maintenance_tasks_assigned_to")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(MaintenanceTasks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MaintenanceTasks {
    Table,
    Id,
    MotorId,
    AssignedToUserId,
    CreatedByUserId,
    Title,
    Description,
    ScheduledDate,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Motors {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
