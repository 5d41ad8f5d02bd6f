//! # Motors API Handlers
//!
//! CRUD over motors. Any active user may use these routes.

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::handlers::types::{ApiJson, ApiPath, optional_timestamp};
use crate::models::motor;
use crate::policy::{Action, Resource, authorize};
use crate::repositories::{MotorPatch, MotorRepository, NewMotor};
use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request payload for registering a motor
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMotorRequest {
    #[schema(example = "Conveyor drive A")]
    pub name: String,
    /// Unique plant code
    #[schema(example = "M001")]
    pub code: String,
    pub location: Option<String>,
    pub description: Option<String>,
    /// UID of the sensor board mounted on the motor
    #[serde(alias = "esp32_uid")]
    pub device_uid: Option<String>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateMotorRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "esp32_uid")]
    pub device_uid: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MotorResponse {
    pub id: i32,
    pub name: String,
    pub code: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub device_uid: Option<String>,
    pub is_running: bool,
    pub last_temperature: Option<f64>,
    pub last_vibration: Option<f64>,
    pub last_current: Option<f64>,
    pub last_speed_rpm: Option<f64>,
    pub last_battery_percent: Option<f64>,
    pub last_update: Option<String>,
}

impl From<motor::Model> for MotorResponse {
    fn from(motor: motor::Model) -> Self {
        Self {
            id: motor.id,
            last_update: optional_timestamp(&motor.last_update),
            name: motor.name,
            code: motor.code,
            location: motor.location,
            description: motor.description,
            device_uid: motor.device_uid,
            is_running: motor.is_running,
            last_temperature: motor.last_temperature,
            last_vibration: motor.last_vibration,
            last_current: motor.last_current,
            last_speed_rpm: motor.last_speed_rpm,
            last_battery_percent: motor.last_battery_percent,
        }
    }
}

/// Register a motor
#[utoipa::path(
    post,
    path = "/motors",
    security(("bearer_auth" = [])),
    request_body = CreateMotorRequest,
    responses(
        (status = 201, description = "Motor created", body = MotorResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 409, description = "Motor code already exists", body = ApiError)
    ),
    tag = "motors"
)]
pub async fn create_motor(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<CreateMotorRequest>,
) -> Result<(StatusCode, Json<MotorResponse>), ApiError> {
    authorize(&current.principal(), Action::ManageMotors, &Resource::None)?;

    let motor = MotorRepository::new(&state.db)
        .create(NewMotor {
            name: request.name,
            code: request.code,
            location: request.location,
            description: request.description,
            device_uid: request.device_uid,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(motor.into())))
}

/// List motors ordered by id
#[utoipa::path(
    get,
    path = "/motors",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All motors", body = [MotorResponse]),
        (status = 401, description = "Not authenticated", body = ApiError)
    ),
    tag = "motors"
)]
pub async fn list_motors(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<MotorResponse>>, ApiError> {
    authorize(&current.principal(), Action::ReadMotors, &Resource::None)?;

    let motors = MotorRepository::new(&state.db).list().await?;
    Ok(Json(motors.into_iter().map(MotorResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/motors/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Motor id")),
    responses(
        (status = 200, description = "Motor", body = MotorResponse),
        (status = 404, description = "Motor not found", body = ApiError)
    ),
    tag = "motors"
)]
pub async fn get_motor(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(motor_id): ApiPath<i32>,
) -> Result<Json<MotorResponse>, ApiError> {
    authorize(
        &current.principal(),
        Action::ReadMotors,
        &Resource::Motor { id: motor_id },
    )?;

    let motor = MotorRepository::new(&state.db).get(motor_id).await?;
    Ok(Json(motor.into()))
}

#[utoipa::path(
    put,
    path = "/motors/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Motor id")),
    request_body = UpdateMotorRequest,
    responses(
        (status = 200, description = "Updated motor", body = MotorResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Motor not found", body = ApiError)
    ),
    tag = "motors"
)]
pub async fn update_motor(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(motor_id): ApiPath<i32>,
    ApiJson(request): ApiJson<UpdateMotorRequest>,
) -> Result<Json<MotorResponse>, ApiError> {
    authorize(
        &current.principal(),
        Action::ManageMotors,
        &Resource::Motor { id: motor_id },
    )?;

    let motor = MotorRepository::new(&state.db)
        .update(
            motor_id,
            MotorPatch {
                name: request.name,
                location: request.location,
                description: request.description,
                device_uid: request.device_uid,
            },
        )
        .await?;

    Ok(Json(motor.into()))
}

/// Delete a motor with its telemetry, tasks and safety config
#[utoipa::path(
    delete,
    path = "/motors/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Motor id")),
    responses(
        (status = 204, description = "Motor deleted"),
        (status = 404, description = "Motor not found", body = ApiError)
    ),
    tag = "motors"
)]
pub async fn delete_motor(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(motor_id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    authorize(
        &current.principal(),
        Action::ManageMotors,
        &Resource::Motor { id: motor_id },
    )?;

    MotorRepository::new(&state.db).delete(motor_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
