//! # Safety Config API Handlers

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::handlers::types::{ApiJson, ApiPath, optional_timestamp, timestamp};
use crate::models::safety_config;
use crate::policy::{Action, Resource, authorize};
use crate::repositories::{NewSafetyConfig, SafetyConfigPatch, SafetyConfigRepository};
use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// New thresholds for a motor; omitted values take the plant defaults
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSafetyConfigRequest {
    pub motor_id: i32,
    #[schema(example = 80.0)]
    pub max_temperature: Option<f64>,
    #[schema(example = 5.0)]
    pub max_vibration: Option<f64>,
    #[schema(example = 20.0)]
    pub min_battery_percent: Option<f64>,
    #[schema(example = 5)]
    pub emergency_stop_delay_seconds: Option<i32>,
    pub enable_sms_alerts: Option<bool>,
    pub sms_phone_number: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSafetyConfigRequest {
    pub max_temperature: Option<f64>,
    pub max_vibration: Option<f64>,
    pub min_battery_percent: Option<f64>,
    pub emergency_stop_delay_seconds: Option<i32>,
    pub enable_sms_alerts: Option<bool>,
    pub sms_phone_number: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SafetyConfigResponse {
    pub id: i32,
    pub motor_id: i32,
    pub max_temperature: f64,
    pub max_vibration: f64,
    pub min_battery_percent: f64,
    pub emergency_stop_delay_seconds: i32,
    pub enable_sms_alerts: bool,
    pub sms_phone_number: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<safety_config::Model> for SafetyConfigResponse {
    fn from(config: safety_config::Model) -> Self {
        Self {
            id: config.id,
            motor_id: config.motor_id,
            max_temperature: config.max_temperature,
            max_vibration: config.max_vibration,
            min_battery_percent: config.min_battery_percent,
            emergency_stop_delay_seconds: config.emergency_stop_delay_seconds,
            enable_sms_alerts: config.enable_sms_alerts,
            created_at: timestamp(&config.created_at),
            updated_at: optional_timestamp(&config.updated_at),
            sms_phone_number: config.sms_phone_number,
        }
    }
}

#[utoipa::path(
    post,
    path = "/safety/configs",
    security(("bearer_auth" = [])),
    request_body = CreateSafetyConfigRequest,
    responses(
        (status = 201, description = "Config created", body = SafetyConfigResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Motor not found", body = ApiError),
        (status = 409, description = "Safety config already exists for this motor", body = ApiError)
    ),
    tag = "safety"
)]
pub async fn create_config(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<CreateSafetyConfigRequest>,
) -> Result<(StatusCode, Json<SafetyConfigResponse>), ApiError> {
    authorize(
        &current.principal(),
        Action::ManageSafety,
        &Resource::Motor {
            id: request.motor_id,
        },
    )?;

    let config = SafetyConfigRepository::new(&state.db)
        .create(NewSafetyConfig {
            motor_id: request.motor_id,
            max_temperature: request.max_temperature,
            max_vibration: request.max_vibration,
            min_battery_percent: request.min_battery_percent,
            emergency_stop_delay_seconds: request.emergency_stop_delay_seconds,
            enable_sms_alerts: request.enable_sms_alerts,
            sms_phone_number: request.sms_phone_number,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(config.into())))
}

#[utoipa::path(
    get,
    path = "/safety/configs/motor/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Motor id")),
    responses(
        (status = 200, description = "Config", body = SafetyConfigResponse),
        (status = 404, description = "Safety config not found for this motor", body = ApiError)
    ),
    tag = "safety"
)]
pub async fn get_config(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(motor_id): ApiPath<i32>,
) -> Result<Json<SafetyConfigResponse>, ApiError> {
    authorize(
        &current.principal(),
        Action::ReadSafety,
        &Resource::Motor { id: motor_id },
    )?;

    let config = SafetyConfigRepository::new(&state.db)
        .get_by_motor(motor_id)
        .await?;
    Ok(Json(config.into()))
}

#[utoipa::path(
    put,
    path = "/safety/configs/motor/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Motor id")),
    request_body = UpdateSafetyConfigRequest,
    responses(
        (status = 200, description = "Updated config", body = SafetyConfigResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Safety config not found for this motor", body = ApiError)
    ),
    tag = "safety"
)]
pub async fn update_config(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(motor_id): ApiPath<i32>,
    ApiJson(request): ApiJson<UpdateSafetyConfigRequest>,
) -> Result<Json<SafetyConfigResponse>, ApiError> {
    authorize(
        &current.principal(),
        Action::ManageSafety,
        &Resource::Motor { id: motor_id },
    )?;

    let config = SafetyConfigRepository::new(&state.db)
        .update(
            motor_id,
            SafetyConfigPatch {
                max_temperature: request.max_temperature,
                max_vibration: request.max_vibration,
                min_battery_percent: request.min_battery_percent,
                emergency_stop_delay_seconds: request.emergency_stop_delay_seconds,
                enable_sms_alerts: request.enable_sms_alerts,
                sms_phone_number: request.sms_phone_number,
            },
        )
        .await?;

    Ok(Json(config.into()))
}
