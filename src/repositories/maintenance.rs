//! # Maintenance Repository
//!
//! Tasks and their completion reports. Creating a report and closing its task
//! happen in one transaction.

use crate::error::RepositoryError;
use crate::models::TaskStatus;
use crate::models::maintenance_report::{
    ActiveModel as ReportActiveModel, Column as ReportColumn, Entity as MaintenanceReport,
    Model as ReportModel,
};
use crate::models::maintenance_task::{
    ActiveModel as TaskActiveModel, Column as TaskColumn, Entity as MaintenanceTask,
    Model as TaskModel,
};
use crate::models::motor::Entity as Motor;
use crate::models::user::Entity as User;
use crate::policy::TaskScope;
use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde_json::json;

use super::{optional_text, require_text};

/// Request data for scheduling a task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub motor_id: i32,
    pub assigned_to_user_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_date: DateTimeWithTimeZone,
}

/// Listing filters; `scope` comes from the authorizer and always wins.
#[derive(Debug, Clone, Copy)]
pub struct TaskFilter {
    pub scope: TaskScope,
    pub motor_id: Option<i32>,
    pub assigned_to_user_id: Option<i32>,
    pub status: Option<TaskStatus>,
}

/// Request data for a completion report
#[derive(Debug, Clone)]
pub struct NewReport {
    pub summary: String,
    pub details: Option<String>,
    pub start_time: DateTimeWithTimeZone,
    pub end_time: DateTimeWithTimeZone,
}

/// Repository for maintenance tasks and reports
pub struct MaintenanceRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> MaintenanceRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Schedule a task; the motor and an active assignee must exist
    pub async fn create_task(
        &self,
        request: NewTask,
        created_by_user_id: i32,
    ) -> Result<TaskModel, RepositoryError> {
        let title = require_text("title", &request.title)?;

        Motor::find_by_id(request.motor_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Motor not found"))?;

        let assignee = User::find_by_id(request.assigned_to_user_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Assigned user not found"))?;

        if !assignee.is_active {
            return Err(RepositoryError::invalid_field(
                "assigned_to_user_id",
                "Assigned user is inactive",
            ));
        }

        let task = TaskActiveModel {
            motor_id: Set(request.motor_id),
            assigned_to_user_id: Set(assignee.id),
            created_by_user_id: Set(created_by_user_id),
            title: Set(title),
            description: Set(optional_text(request.description)),
            scheduled_date: Set(request.scheduled_date),
            status: Set(TaskStatus::Planned),
            created_at: Set(Utc::now().fixed_offset()),
            updated_at: Set(None),
            ..Default::default()
        };

        let created = task
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(
            task_id = created.id,
            motor_id = created.motor_id,
            assigned_to = created.assigned_to_user_id,
            "Maintenance task created"
        );
        Ok(created)
    }

    pub async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<TaskModel>, RepositoryError> {
        let mut query = MaintenanceTask::find()
            .order_by_asc(TaskColumn::ScheduledDate)
            .order_by_asc(TaskColumn::Id);

        match filter.scope {
            TaskScope::All => {
                if let Some(assignee) = filter.assigned_to_user_id {
                    query = query.filter(TaskColumn::AssignedToUserId.eq(assignee));
                }
            }
            TaskScope::AssignedTo(user_id) => {
                query = query.filter(TaskColumn::AssignedToUserId.eq(user_id));
            }
            TaskScope::Nothing => return Ok(Vec::new()),
        }

        if let Some(motor_id) = filter.motor_id {
            query = query.filter(TaskColumn::MotorId.eq(motor_id));
        }

        if let Some(status) = filter.status {
            query = query.filter(TaskColumn::Status.eq(status));
        }

        query
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get_task(&self, task_id: i32) -> Result<TaskModel, RepositoryError> {
        MaintenanceTask::find_by_id(task_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Task not found"))
    }

    /// Move a task to `new_status` if the transition table allows it
    pub async fn update_status(
        &self,
        task: TaskModel,
        new_status: TaskStatus,
    ) -> Result<TaskModel, RepositoryError> {
        let current = task.status;
        if !current.can_transition_to(new_status) {
            return Err(RepositoryError::Validation {
                message: format!(
                    "Cannot change task status from {} to {}",
                    current.as_str(),
                    new_status.as_str()
                ),
                details: Some(json!({
                    "from": current.as_str(),
                    "to": new_status.as_str(),
                })),
            });
        }

        if current == new_status {
            return Ok(task);
        }

        let task_id = task.id;
        let mut task = task.into_active_model();
        task.status = Set(new_status);
        task.updated_at = Set(Some(Utc::now().fixed_offset()));

        let updated = task
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(
            task_id,
            from = current.as_str(),
            to = new_status.as_str(),
            "Maintenance task status changed"
        );
        Ok(updated)
    }

    /// File the report for `task` and mark the task done, atomically
    pub async fn create_report(
        &self,
        task: TaskModel,
        request: NewReport,
    ) -> Result<ReportModel, RepositoryError> {
        let summary = require_text("summary", &request.summary)?;
        if request.end_time < request.start_time {
            return Err(RepositoryError::invalid_field(
                "end_time",
                "end_time must not be before start_time",
            ));
        }

        if self.find_report_by_task(task.id).await?.is_some() {
            return Err(RepositoryError::conflict(
                "Report already exists for this task",
            ));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        let now = Utc::now().fixed_offset();
        let report = ReportActiveModel {
            task_id: Set(task.id),
            summary: Set(summary),
            details: Set(optional_text(request.details)),
            start_time: Set(request.start_time),
            end_time: Set(request.end_time),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(RepositoryError::database_error)?;

        let previous = task.status;
        let mut task = task.into_active_model();
        task.status = Set(TaskStatus::Done);
        task.updated_at = Set(Some(now));
        task.update(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        txn.commit()
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(
            task_id = report.task_id,
            report_id = report.id,
            previous_status = previous.as_str(),
            "Maintenance report filed"
        );
        Ok(report)
    }

    pub async fn find_report_by_task(
        &self,
        task_id: i32,
    ) -> Result<Option<ReportModel>, RepositoryError> {
        MaintenanceReport::find()
            .filter(ReportColumn::TaskId.eq(task_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}
