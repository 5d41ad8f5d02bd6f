//! # Maintenance API Handlers
//!
//! Task scheduling, status workflow and completion reports. Technicians only
//! ever see tasks assigned to them; role checks run before any lookup,
//! ownership checks after the task has been loaded.

use crate::auth::CurrentUser;
use crate::error::{ApiError, not_found};
use crate::handlers::types::{ApiJson, ApiPath, ApiQuery, optional_timestamp, timestamp};
use crate::models::{TaskStatus, maintenance_report, maintenance_task};
use crate::policy::{Action, Resource, authorize, task_list_scope};
use crate::repositories::{MaintenanceRepository, NewReport, NewTask, TaskFilter};
use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    pub motor_id: i32,
    pub assigned_to_user_id: i32,
    #[schema(example = "Replace bearings")]
    pub title: String,
    pub description: Option<String>,
    #[schema(value_type = String, format = DateTime, example = "2026-11-02T08:00:00Z")]
    pub scheduled_date: DateTime<FixedOffset>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskResponse {
    pub id: i32,
    pub motor_id: i32,
    pub assigned_to_user_id: i32,
    pub created_by_user_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_date: String,
    pub status: TaskStatus,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<maintenance_task::Model> for TaskResponse {
    fn from(task: maintenance_task::Model) -> Self {
        Self {
            id: task.id,
            motor_id: task.motor_id,
            assigned_to_user_id: task.assigned_to_user_id,
            created_by_user_id: task.created_by_user_id,
            scheduled_date: timestamp(&task.scheduled_date),
            created_at: timestamp(&task.created_at),
            updated_at: optional_timestamp(&task.updated_at),
            title: task.title,
            description: task.description,
            status: task.status,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    pub motor_id: Option<i32>,
    /// Ignored for technicians, who only see their own tasks
    pub assigned_to_user_id: Option<i32>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    pub new_status: TaskStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReportRequest {
    pub task_id: i32,
    pub summary: String,
    pub details: Option<String>,
    #[schema(value_type = String, format = DateTime)]
    pub start_time: DateTime<FixedOffset>,
    #[schema(value_type = String, format = DateTime)]
    pub end_time: DateTime<FixedOffset>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportResponse {
    pub id: i32,
    pub task_id: i32,
    pub summary: String,
    pub details: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub created_at: String,
}

impl From<maintenance_report::Model> for ReportResponse {
    fn from(report: maintenance_report::Model) -> Self {
        Self {
            id: report.id,
            task_id: report.task_id,
            start_time: timestamp(&report.start_time),
            end_time: timestamp(&report.end_time),
            created_at: timestamp(&report.created_at),
            summary: report.summary,
            details: report.details,
        }
    }
}

fn task_resource(task: &maintenance_task::Model) -> Resource {
    Resource::Task {
        assigned_to_user_id: task.assigned_to_user_id,
    }
}

/// Schedule a maintenance task (admin only)
#[utoipa::path(
    post,
    path = "/maintenance/tasks",
    security(("bearer_auth" = [])),
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Motor or assignee not found", body = ApiError)
    ),
    tag = "maintenance"
)]
pub async fn create_task(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    authorize(&current.principal(), Action::CreateTask, &Resource::None)?;

    let task = MaintenanceRepository::new(&state.db)
        .create_task(
            NewTask {
                motor_id: request.motor_id,
                assigned_to_user_id: request.assigned_to_user_id,
                title: request.title,
                description: request.description,
                scheduled_date: request.scheduled_date,
            },
            current.id(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(task.into())))
}

/// List tasks visible to the caller, ordered by scheduled date
#[utoipa::path(
    get,
    path = "/maintenance/tasks",
    security(("bearer_auth" = [])),
    params(TaskListQuery),
    responses(
        (status = 200, description = "Tasks", body = [TaskResponse]),
        (status = 401, description = "Not authenticated", body = ApiError)
    ),
    tag = "maintenance"
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(query): ApiQuery<TaskListQuery>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let principal = current.principal();
    authorize(&principal, Action::ListTasks, &Resource::None)?;

    let tasks = MaintenanceRepository::new(&state.db)
        .list_tasks(TaskFilter {
            scope: task_list_scope(&principal),
            motor_id: query.motor_id,
            assigned_to_user_id: query.assigned_to_user_id,
            status: query.status,
        })
        .await?;

    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/maintenance/tasks/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task", body = TaskResponse),
        (status = 403, description = "Task is assigned to someone else", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError)
    ),
    tag = "maintenance"
)]
pub async fn get_task(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(task_id): ApiPath<i32>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = MaintenanceRepository::new(&state.db)
        .get_task(task_id)
        .await?;
    authorize(&current.principal(), Action::ReadTask, &task_resource(&task))?;

    Ok(Json(task.into()))
}

/// Move a task through its workflow
#[utoipa::path(
    put,
    path = "/maintenance/tasks/{id}/status",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Task id"), StatusQuery),
    responses(
        (status = 200, description = "Updated task", body = TaskResponse),
        (status = 400, description = "Transition not allowed", body = ApiError),
        (status = 403, description = "Task is assigned to someone else", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError)
    ),
    tag = "maintenance"
)]
pub async fn update_task_status(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(task_id): ApiPath<i32>,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> Result<Json<TaskResponse>, ApiError> {
    let maintenance = MaintenanceRepository::new(&state.db);
    let task = maintenance.get_task(task_id).await?;
    authorize(
        &current.principal(),
        Action::UpdateTaskStatus,
        &task_resource(&task),
    )?;

    let task = maintenance.update_status(task, query.new_status).await?;
    Ok(Json(task.into()))
}

/// File the completion report for a task; the task becomes DONE
#[utoipa::path(
    post,
    path = "/maintenance/reports",
    security(("bearer_auth" = [])),
    request_body = CreateReportRequest,
    responses(
        (status = 201, description = "Report filed", body = ReportResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Task is assigned to someone else", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError),
        (status = 409, description = "Report already exists for this task", body = ApiError)
    ),
    tag = "maintenance"
)]
pub async fn create_report(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<CreateReportRequest>,
) -> Result<(StatusCode, Json<ReportResponse>), ApiError> {
    let maintenance = MaintenanceRepository::new(&state.db);
    let task = maintenance.get_task(request.task_id).await?;
    authorize(
        &current.principal(),
        Action::CreateReport,
        &task_resource(&task),
    )?;

    let report = maintenance
        .create_report(
            task,
            NewReport {
                summary: request.summary,
                details: request.details,
                start_time: request.start_time,
                end_time: request.end_time,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(report.into())))
}

#[utoipa::path(
    get,
    path = "/maintenance/reports/task/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Task id")),
    responses(
        (status = 200, description = "Report", body = ReportResponse),
        (status = 403, description = "Task is assigned to someone else", body = ApiError),
        (status = 404, description = "Task or report not found", body = ApiError)
    ),
    tag = "maintenance"
)]
pub async fn get_report_for_task(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(task_id): ApiPath<i32>,
) -> Result<Json<ReportResponse>, ApiError> {
    let maintenance = MaintenanceRepository::new(&state.db);
    let task = maintenance.get_task(task_id).await?;
    authorize(&current.principal(), Action::ReadReport, &task_resource(&task))?;

    let report = maintenance
        .find_report_by_task(task.id)
        .await?
        .ok_or_else(|| not_found("Report not found"))?;

    Ok(Json(report.into()))
}
