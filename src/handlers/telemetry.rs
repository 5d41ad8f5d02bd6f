//! # Telemetry API Handlers
//!
//! User-submitted samples and history reads. Device ingestion lives in
//! [`crate::handlers::iot`].

use crate::auth::CurrentUser;
use crate::error::{ApiError, not_found};
use crate::handlers::types::{ApiJson, ApiPath, ApiQuery, timestamp};
use crate::models::telemetry;
use crate::policy::{Action, Resource, authorize};
use crate::repositories::{NewTelemetry, TelemetryRepository, TelemetryWindow};
use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use metrics::counter;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// One sensor sample
#[derive(Debug, Deserialize, ToSchema)]
pub struct TelemetryRequest {
    pub motor_id: i32,
    #[schema(example = 55.5)]
    pub temperature: f64,
    pub vibration: f64,
    pub current: f64,
    #[schema(example = 1450.0)]
    pub speed_rpm: f64,
    pub is_running: bool,
    pub battery_percent: Option<f64>,
}

impl From<TelemetryRequest> for NewTelemetry {
    fn from(request: TelemetryRequest) -> Self {
        NewTelemetry {
            motor_id: request.motor_id,
            temperature: request.temperature,
            vibration: request.vibration,
            current: request.current,
            speed_rpm: request.speed_rpm,
            is_running: request.is_running,
            battery_percent: request.battery_percent,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TelemetryResponse {
    pub id: i32,
    pub motor_id: i32,
    pub temperature: f64,
    pub vibration: f64,
    pub current: f64,
    pub speed_rpm: f64,
    pub is_running: bool,
    pub battery_percent: Option<f64>,
    pub created_at: String,
}

impl From<telemetry::Model> for TelemetryResponse {
    fn from(sample: telemetry::Model) -> Self {
        Self {
            id: sample.id,
            motor_id: sample.motor_id,
            temperature: sample.temperature,
            vibration: sample.vibration,
            current: sample.current,
            speed_rpm: sample.speed_rpm,
            is_running: sample.is_running,
            battery_percent: sample.battery_percent,
            created_at: timestamp(&sample.created_at),
        }
    }
}

/// History window; out-of-range values are clamped
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Maximum number of samples (default 100, at most 1000)
    pub limit: Option<u64>,
    /// How far back to look, in hours (default 24)
    pub hours: Option<i64>,
}

/// Record a sample and refresh the motor's cached readings
#[utoipa::path(
    post,
    path = "/telemetry",
    security(("bearer_auth" = [])),
    request_body = TelemetryRequest,
    responses(
        (status = 201, description = "Sample recorded", body = TelemetryResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Motor not found", body = ApiError)
    ),
    tag = "telemetry"
)]
pub async fn create_telemetry(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<TelemetryRequest>,
) -> Result<(StatusCode, Json<TelemetryResponse>), ApiError> {
    authorize(
        &current.principal(),
        Action::CreateTelemetry,
        &Resource::Motor {
            id: request.motor_id,
        },
    )?;

    let sample = TelemetryRepository::new(&state.db)
        .record(request.into())
        .await?;
    counter!("telemetry_ingested_total", "source" => "user").increment(1);

    Ok((StatusCode::CREATED, Json(sample.into())))
}

#[utoipa::path(
    get,
    path = "/telemetry/motor/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Motor id"), HistoryQuery),
    responses(
        (status = 200, description = "Samples, newest first", body = [TelemetryResponse]),
        (status = 404, description = "Motor not found", body = ApiError)
    ),
    tag = "telemetry"
)]
pub async fn motor_history(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(motor_id): ApiPath<i32>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> Result<Json<Vec<TelemetryResponse>>, ApiError> {
    authorize(
        &current.principal(),
        Action::ReadTelemetry,
        &Resource::Motor { id: motor_id },
    )?;

    let window = TelemetryWindow {
        limit: query.limit,
        hours: query.hours,
    };
    let samples = TelemetryRepository::new(&state.db)
        .history(motor_id, window)
        .await?;

    Ok(Json(
        samples.into_iter().map(TelemetryResponse::from).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/telemetry/motor/{id}/latest",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Motor id")),
    responses(
        (status = 200, description = "Most recent sample", body = TelemetryResponse),
        (status = 404, description = "No telemetry data found for this motor", body = ApiError)
    ),
    tag = "telemetry"
)]
pub async fn motor_latest(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(motor_id): ApiPath<i32>,
) -> Result<Json<TelemetryResponse>, ApiError> {
    authorize(
        &current.principal(),
        Action::ReadTelemetry,
        &Resource::Motor { id: motor_id },
    )?;

    let sample = TelemetryRepository::new(&state.db)
        .latest(motor_id)
        .await?
        .ok_or_else(|| not_found("No telemetry data found for this motor"))?;

    Ok(Json(sample.into()))
}
