//! MaintenanceTask entity model
//!
//! Work items scheduled against a motor and assigned to a technician. The
//! status column follows [`TaskStatus::can_transition_to`].

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle state of a maintenance task
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[sea_orm(string_value = "PLANNED")]
    Planned,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "DONE")]
    Done,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl TaskStatus {
    /// Whether a status update from `self` to `next` is allowed.
    ///
    /// Re-submitting the current status is accepted as a no-op. Any task may
    /// be cancelled, and `Cancelled` is terminal. A report forces `Done`
    /// without consulting this.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;

        self == next
            || matches!(
                (self, next),
                (Planned, InProgress)
                    | (InProgress, Done)
                    | (Planned | InProgress | Done, Cancelled)
            )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Planned => "PLANNED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Maintenance task entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "maintenance_tasks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub motor_id: i32,

    /// Technician responsible for the work; drives ownership checks
    pub assigned_to_user_id: i32,

    pub created_by_user_id: i32,

    pub title: String,

    pub description: Option<String>,

    pub scheduled_date: DateTimeWithTimeZone,

    pub status: TaskStatus,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::motor::Entity",
        from = "Column::MotorId",
        to = "super::motor::Column::Id",
        on_delete = "Cascade"
    )]
    Motor,
    #[sea_orm(has_one = "super::maintenance_report::Entity")]
    MaintenanceReport,
}

impl Related<super::motor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Motor.def()
    }
}

impl Related<super::maintenance_report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MaintenanceReport.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
