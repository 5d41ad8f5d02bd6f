//! # IoT Simulation Handlers
//!
//! Stand-ins for a device protocol: motor status lookup and run/stop
//! commands for users, plus the telemetry ingestion endpoint that is the only
//! route authenticated with a device key.

use crate::auth::{CurrentUser, DeviceAuth};
use crate::error::{ApiError, bad_request, not_found};
use crate::handlers::telemetry::TelemetryRequest;
use crate::handlers::types::{ApiJson, ApiQuery, StatusMessage, timestamp};
use crate::models::motor;
use crate::policy::{Action, Resource, authorize};
use crate::repositories::{MotorRepository, TelemetryRepository};
use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Identifies a motor by its device UID or its plant code
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MotorLookup {
    pub esp32_uid: Option<String>,
    pub motor_code: Option<String>,
}

impl MotorLookup {
    async fn resolve(&self, motors: &MotorRepository<'_>) -> Result<motor::Model, ApiError> {
        let found = if let Some(uid) = self.esp32_uid.as_deref().filter(|v| !v.trim().is_empty()) {
            motors.find_by_device_uid(uid).await?
        } else if let Some(code) = self.motor_code.as_deref().filter(|v| !v.trim().is_empty()) {
            motors.find_by_code(code).await?
        } else {
            return Err(bad_request("esp32_uid or motor_code required"));
        };

        found.ok_or_else(|| not_found("Motor not found"))
    }
}

/// Snapshot of a motor's last known readings
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MotorStatusResponse {
    pub esp32_uid: String,
    pub motor_code: String,
    pub temperature: f64,
    pub vibration: f64,
    pub current: f64,
    pub speed_rpm: f64,
    pub is_running: bool,
    pub battery_percent: Option<f64>,
    pub timestamp: String,
}

impl From<motor::Model> for MotorStatusResponse {
    fn from(motor: motor::Model) -> Self {
        let timestamp = motor
            .last_update
            .as_ref()
            .map(timestamp)
            .unwrap_or_else(|| Utc::now().fixed_offset().to_rfc3339());

        Self {
            esp32_uid: motor.device_uid.unwrap_or_else(|| "UNKNOWN".to_string()),
            motor_code: motor.code,
            temperature: motor.last_temperature.unwrap_or(0.0),
            vibration: motor.last_vibration.unwrap_or(0.0),
            current: motor.last_current.unwrap_or(0.0),
            speed_rpm: motor.last_speed_rpm.unwrap_or(0.0),
            is_running: motor.is_running,
            battery_percent: motor.last_battery_percent,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorAction {
    Start,
    Stop,
}

impl MotorAction {
    fn as_str(self) -> &'static str {
        match self {
            MotorAction::Start => "START",
            MotorAction::Stop => "STOP",
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MotorCommandRequest {
    /// `START` or `STOP`
    #[schema(example = "START")]
    pub action: String,
    pub target_speed_rpm: Option<f64>,
}

impl MotorCommandRequest {
    fn action(&self) -> Result<MotorAction, ApiError> {
        match self.action.trim().to_ascii_uppercase().as_str() {
            "START" => Ok(MotorAction::Start),
            "STOP" => Ok(MotorAction::Stop),
            _ => Err(bad_request("Invalid action. Use START or STOP")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    #[schema(example = "ok")]
    pub status: String,
    pub telemetry_id: i32,
}

#[utoipa::path(
    get,
    path = "/iot/motor/status",
    security(("bearer_auth" = [])),
    params(MotorLookup),
    responses(
        (status = 200, description = "Motor status", body = MotorStatusResponse),
        (status = 400, description = "No lookup key given", body = ApiError),
        (status = 404, description = "Motor not found", body = ApiError)
    ),
    tag = "iot"
)]
pub async fn motor_status(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(lookup): ApiQuery<MotorLookup>,
) -> Result<Json<MotorStatusResponse>, ApiError> {
    authorize(&current.principal(), Action::ReadMotorStatus, &Resource::None)?;

    let motor = lookup.resolve(&MotorRepository::new(&state.db)).await?;
    Ok(Json(motor.into()))
}

/// Simulated start/stop command
#[utoipa::path(
    post,
    path = "/iot/motor/command",
    security(("bearer_auth" = [])),
    params(MotorLookup),
    request_body = MotorCommandRequest,
    responses(
        (status = 200, description = "Command applied", body = StatusMessage),
        (status = 400, description = "Invalid action or no lookup key", body = ApiError),
        (status = 404, description = "Motor not found", body = ApiError)
    ),
    tag = "iot"
)]
pub async fn motor_command(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(lookup): ApiQuery<MotorLookup>,
    ApiJson(request): ApiJson<MotorCommandRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    authorize(&current.principal(), Action::SendMotorCommand, &Resource::None)?;

    let action = request.action()?;
    let motors = MotorRepository::new(&state.db);
    let motor = lookup.resolve(&motors).await?;
    let motor_id = motor.id;

    match action {
        MotorAction::Start => {
            motors
                .apply_command(motor, true, request.target_speed_rpm)
                .await?
        }
        MotorAction::Stop => motors.apply_command(motor, false, Some(0.0)).await?,
    };

    tracing::info!(
        motor_id,
        action = action.as_str(),
        user_id = current.id(),
        "Motor command executed"
    );
    Ok(Json(StatusMessage::with_message(format!(
        "Command {} executed",
        action.as_str()
    ))))
}

/// Telemetry pushed by a device for the motor it is bound to
#[utoipa::path(
    post,
    path = "/iot/telemetry/from-esp32",
    security(("api_key" = [])),
    request_body = TelemetryRequest,
    responses(
        (status = 201, description = "Sample recorded", body = IngestResponse),
        (status = 400, description = "Device not associated with a motor", body = ApiError),
        (status = 401, description = "Invalid or inactive API key", body = ApiError),
        (status = 403, description = "Motor ID mismatch", body = ApiError)
    ),
    tag = "iot"
)]
pub async fn ingest_from_device(
    State(state): State<AppState>,
    device: DeviceAuth,
    ApiJson(request): ApiJson<TelemetryRequest>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    authorize(
        &device.principal(),
        Action::IngestDeviceTelemetry,
        &Resource::Motor {
            id: request.motor_id,
        },
    )?;

    let sample = TelemetryRepository::new(&state.db)
        .record(request.into())
        .await?;
    counter!("telemetry_ingested_total", "source" => "device").increment(1);
    tracing::debug!(
        device_id = device.0.id,
        telemetry_id = sample.id,
        "Device telemetry ingested"
    );

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            status: "ok".to_string(),
            telemetry_id: sample.id,
        }),
    ))
}
