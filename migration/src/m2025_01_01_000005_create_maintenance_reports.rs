//! Migration to create the maintenance_reports table.
//!
//! A task has at most one report, enforced by a unique index on `task_id`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MaintenanceReports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MaintenanceReports::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceReports::TaskId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MaintenanceReports::Summary).text().not_null())
                    .col(ColumnDef::new(MaintenanceReports::Details).text().null())
                    .col(
                        ColumnDef::new(MaintenanceReports::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceReports::EndTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceReports::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_maintenance_reports_task_id")
                            .from(MaintenanceReports::Table, MaintenanceReports::TaskId)
                            .to(MaintenanceTasks::Table, MaintenanceTasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_maintenance_reports_task_id")
                    .table(MaintenanceReports::Table)
                    .col(MaintenanceReports::TaskId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_maintenance_reports_task_id")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(MaintenanceReports::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MaintenanceReports {
    Table,
    Id,
    TaskId,
    Summary,
    Details,
    StartTime,
    EndTime,
    CreatedAt,
}

#[derive(DeriveIden)]
enum MaintenanceTasks {
    Table,
    Id,
}
