//! # Repository Layer
//!
//! Repositories encapsulate SeaORM access for each entity: input validation,
//! foreign-key existence and uniqueness checks, and the atomic writes that keep
//! denormalized columns in step with their source rows.

pub mod device;
pub mod maintenance;
pub mod motor;
pub mod safety_config;
pub mod telemetry;
pub mod user;

pub use device::DeviceRepository;
pub use maintenance::{MaintenanceRepository, NewReport, NewTask, TaskFilter};
pub use motor::{MotorPatch, MotorRepository, NewMotor};
pub use safety_config::{NewSafetyConfig, SafetyConfigPatch, SafetyConfigRepository};
pub use telemetry::{NewTelemetry, TelemetryRepository, TelemetryWindow};
pub use user::{NewUser, UserRepository};

use crate::error::RepositoryError;

/// Reject blank required strings, returning the trimmed value.
pub(crate) fn require_text(field: &str, value: &str) -> Result<String, RepositoryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RepositoryError::invalid_field(
            field,
            format!("{} must not be empty", field),
        ));
    }
    Ok(trimmed.to_string())
}

/// Normalise optional free text: blank becomes `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
