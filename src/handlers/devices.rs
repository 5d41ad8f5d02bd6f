//! # Device API Handlers
//!
//! Administration of sensor devices and their API keys. All routes are
//! admin-only. The key is only ever returned by registration and rotation.

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::handlers::types::{ApiJson, ApiPath, ApiQuery, optional_timestamp, timestamp};
use crate::models::device;
use crate::policy::{Action, Resource, authorize};
use crate::repositories::DeviceRepository;
use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDeviceRequest {
    #[serde(alias = "esp32_uid")]
    #[schema(example = "ESP32-A1B2C3")]
    pub device_uid: String,
    pub motor_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeviceResponse {
    pub id: i32,
    pub device_uid: String,
    pub motor_id: Option<i32>,
    pub is_active: bool,
    pub created_at: String,
    pub last_seen: Option<String>,
}

impl From<&device::Model> for DeviceResponse {
    fn from(device: &device::Model) -> Self {
        Self {
            id: device.id,
            device_uid: device.device_uid.clone(),
            motor_id: device.motor_id,
            is_active: device.is_active,
            created_at: timestamp(&device.created_at),
            last_seen: optional_timestamp(&device.last_seen),
        }
    }
}

/// Device plus its current API key
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeviceCredentialsResponse {
    #[serde(flatten)]
    pub device: DeviceResponse,
    pub api_key: String,
}

impl From<device::Model> for DeviceCredentialsResponse {
    fn from(device: device::Model) -> Self {
        Self {
            device: DeviceResponse::from(&device),
            api_key: device.api_key,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BindMotorQuery {
    pub motor_id: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivationQuery {
    pub is_active: bool,
}

/// Register a device and issue its API key
#[utoipa::path(
    post,
    path = "/esp32-devices",
    security(("bearer_auth" = [])),
    request_body = CreateDeviceRequest,
    responses(
        (status = 201, description = "Device registered", body = DeviceCredentialsResponse),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Motor not found", body = ApiError),
        (status = 409, description = "Device UID already registered", body = ApiError)
    ),
    tag = "devices"
)]
pub async fn create_device(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<CreateDeviceRequest>,
) -> Result<(StatusCode, Json<DeviceCredentialsResponse>), ApiError> {
    authorize(&current.principal(), Action::ManageDevices, &Resource::None)?;

    let device = DeviceRepository::new(&state.db)
        .create(&request.device_uid, request.motor_id)
        .await?;

    Ok((StatusCode::CREATED, Json(device.into())))
}

#[utoipa::path(
    get,
    path = "/esp32-devices",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Devices, newest first", body = [DeviceResponse]),
        (status = 403, description = "Admin role required", body = ApiError)
    ),
    tag = "devices"
)]
pub async fn list_devices(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<DeviceResponse>>, ApiError> {
    authorize(&current.principal(), Action::ManageDevices, &Resource::None)?;

    let devices = DeviceRepository::new(&state.db).list().await?;
    Ok(Json(devices.iter().map(DeviceResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/esp32-devices/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Device id")),
    responses(
        (status = 200, description = "Device", body = DeviceResponse),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Device not found", body = ApiError)
    ),
    tag = "devices"
)]
pub async fn get_device(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(device_id): ApiPath<i32>,
) -> Result<Json<DeviceResponse>, ApiError> {
    authorize(&current.principal(), Action::ManageDevices, &Resource::None)?;

    let device = DeviceRepository::new(&state.db).get(device_id).await?;
    Ok(Json(DeviceResponse::from(&device)))
}

/// Bind a device to a motor
#[utoipa::path(
    patch,
    path = "/esp32-devices/{id}/motor",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Device id"), BindMotorQuery),
    responses(
        (status = 200, description = "Updated device", body = DeviceResponse),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Device or motor not found", body = ApiError)
    ),
    tag = "devices"
)]
pub async fn bind_motor(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(device_id): ApiPath<i32>,
    ApiQuery(query): ApiQuery<BindMotorQuery>,
) -> Result<Json<DeviceResponse>, ApiError> {
    authorize(&current.principal(), Action::ManageDevices, &Resource::None)?;

    let device = DeviceRepository::new(&state.db)
        .bind_motor(device_id, query.motor_id)
        .await?;
    Ok(Json(DeviceResponse::from(&device)))
}

/// Replace the device's API key; the previous key stops working immediately
#[utoipa::path(
    post,
    path = "/esp32-devices/{id}/regenerate-api-key",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Device id")),
    responses(
        (status = 200, description = "New key issued", body = DeviceCredentialsResponse),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Device not found", body = ApiError)
    ),
    tag = "devices"
)]
pub async fn regenerate_api_key(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(device_id): ApiPath<i32>,
) -> Result<Json<DeviceCredentialsResponse>, ApiError> {
    authorize(&current.principal(), Action::ManageDevices, &Resource::None)?;

    let device = DeviceRepository::new(&state.db)
        .regenerate_api_key(device_id)
        .await?;
    tracing::info!(device_id, rotated_by = current.id(), "Device API key regenerated");

    Ok(Json(device.into()))
}

#[utoipa::path(
    patch,
    path = "/esp32-devices/{id}/activate",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Device id"), ActivationQuery),
    responses(
        (status = 200, description = "Updated device", body = DeviceResponse),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Device not found", body = ApiError)
    ),
    tag = "devices"
)]
pub async fn set_device_active(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(device_id): ApiPath<i32>,
    ApiQuery(query): ApiQuery<ActivationQuery>,
) -> Result<Json<DeviceResponse>, ApiError> {
    authorize(&current.principal(), Action::ManageDevices, &Resource::None)?;

    let device = DeviceRepository::new(&state.db)
        .set_active(device_id, query.is_active)
        .await?;
    Ok(Json(DeviceResponse::from(&device)))
}

#[utoipa::path(
    delete,
    path = "/esp32-devices/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Device id")),
    responses(
        (status = 204, description = "Device deleted"),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Device not found", body = ApiError)
    ),
    tag = "devices"
)]
pub async fn delete_device(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(device_id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    authorize(&current.principal(), Action::ManageDevices, &Resource::None)?;

    DeviceRepository::new(&state.db).delete(device_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
