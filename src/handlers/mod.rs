//! # API Handlers
//!
//! HTTP endpoint handlers for the MotorGuard API, grouped by resource.

use crate::db;
use crate::error::ApiError;
use crate::models::ServiceInfo;
use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::Json};

pub mod auth;
pub mod devices;
pub mod iot;
pub mod maintenance;
pub mod motors;
pub mod safety;
pub mod telemetry;
pub mod types;
pub mod users;

pub use types::StatusMessage;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = StatusMessage)
    ),
    tag = "root"
)]
pub async fn health() -> Json<StatusMessage> {
    Json(StatusMessage::ok())
}

/// Readiness probe: succeeds once the database answers
#[utoipa::path(
    get,
    path = "/readyz",
    responses(
        (status = 200, description = "Database reachable", body = StatusMessage),
        (status = 503, description = "Database unreachable", body = ApiError)
    ),
    tag = "root"
)]
pub async fn readyz(State(state): State<AppState>) -> Result<Json<StatusMessage>, ApiError> {
    db::health_check(&state.db).await.map_err(|error| {
        tracing::warn!(%error, "Readiness check failed");
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "Database unavailable",
        )
    })?;

    Ok(Json(StatusMessage::ok()))
}

#[cfg(test)]
mod tests;
