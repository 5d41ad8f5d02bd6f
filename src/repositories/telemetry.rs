//! # Telemetry Repository
//!
//! Telemetry rows are append-only. Recording a sample also refreshes the
//! motor's cached `last_*` columns inside the same transaction.

use crate::error::RepositoryError;
use crate::models::motor::Entity as Motor;
use crate::models::telemetry::{ActiveModel, Column, Entity as Telemetry, Model as TelemetryModel};
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

pub const DEFAULT_HISTORY_LIMIT: u64 = 100;
pub const MAX_HISTORY_LIMIT: u64 = 1000;
pub const DEFAULT_HISTORY_HOURS: i64 = 24;
pub const MAX_HISTORY_HOURS: i64 = 24 * 365;

/// A telemetry sample to record
#[derive(Debug, Clone)]
pub struct NewTelemetry {
    pub motor_id: i32,
    pub temperature: f64,
    pub vibration: f64,
    pub current: f64,
    pub speed_rpm: f64,
    pub is_running: bool,
    pub battery_percent: Option<f64>,
}

impl NewTelemetry {
    fn validate(&self) -> Result<(), RepositoryError> {
        for (field, value) in [
            ("temperature", self.temperature),
            ("vibration", self.vibration),
            ("current", self.current),
            ("speed_rpm", self.speed_rpm),
        ] {
            if !value.is_finite() {
                return Err(RepositoryError::invalid_field(
                    field,
                    format!("{} must be a finite number", field),
                ));
            }
        }

        if self.speed_rpm < 0.0 {
            return Err(RepositoryError::invalid_field(
                "speed_rpm",
                "speed_rpm must not be negative",
            ));
        }

        if let Some(battery) = self.battery_percent
            && !(0.0..=100.0).contains(&battery)
        {
            return Err(RepositoryError::invalid_field(
                "battery_percent",
                "battery_percent must be between 0 and 100",
            ));
        }

        Ok(())
    }
}

/// History query window; missing or out-of-range values are clamped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelemetryWindow {
    pub limit: Option<u64>,
    pub hours: Option<i64>,
}

impl TelemetryWindow {
    pub fn limit(&self) -> u64 {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }

    pub fn hours(&self) -> i64 {
        self.hours
            .unwrap_or(DEFAULT_HISTORY_HOURS)
            .clamp(1, MAX_HISTORY_HOURS)
    }
}

/// Repository for Telemetry database operations
pub struct TelemetryRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> TelemetryRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert a sample and refresh the motor cache atomically
    pub async fn record(&self, request: NewTelemetry) -> Result<TelemetryModel, RepositoryError> {
        request.validate()?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        let motor = Motor::find_by_id(request.motor_id)
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Motor not found"))?;

        let now = Utc::now().fixed_offset();

        let sample = ActiveModel {
            motor_id: Set(motor.id),
            temperature: Set(request.temperature),
            vibration: Set(request.vibration),
            current: Set(request.current),
            speed_rpm: Set(request.speed_rpm),
            is_running: Set(request.is_running),
            battery_percent: Set(request.battery_percent),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(RepositoryError::database_error)?;

        let mut motor = motor.into_active_model();
        motor.is_running = Set(request.is_running);
        motor.last_temperature = Set(Some(request.temperature));
        motor.last_vibration = Set(Some(request.vibration));
        motor.last_current = Set(Some(request.current));
        motor.last_speed_rpm = Set(Some(request.speed_rpm));
        motor.last_battery_percent = Set(request.battery_percent);
        motor.last_update = Set(Some(now));
        motor
            .update(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        txn.commit()
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::debug!(
            motor_id = sample.motor_id,
            telemetry_id = sample.id,
            "Telemetry recorded"
        );
        Ok(sample)
    }

    /// Samples for a motor inside the window, newest first
    pub async fn history(
        &self,
        motor_id: i32,
        window: TelemetryWindow,
    ) -> Result<Vec<TelemetryModel>, RepositoryError> {
        self.ensure_motor(motor_id).await?;

        let since = (Utc::now() - Duration::hours(window.hours())).fixed_offset();

        Telemetry::find()
            .filter(Column::MotorId.eq(motor_id))
            .filter(Column::CreatedAt.gte(since))
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .limit(window.limit())
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Most recent sample for a motor, if any
    pub async fn latest(&self, motor_id: i32) -> Result<Option<TelemetryModel>, RepositoryError> {
        Telemetry::find()
            .filter(Column::MotorId.eq(motor_id))
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    async fn ensure_motor(&self, motor_id: i32) -> Result<(), RepositoryError> {
        Motor::find_by_id(motor_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .map(|_| ())
            .ok_or_else(|| RepositoryError::not_found("Motor not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewTelemetry {
        NewTelemetry {
            motor_id: 1,
            temperature: 55.5,
            vibration: 1.2,
            current: 3.4,
            speed_rpm: 1450.0,
            is_running: true,
            battery_percent: Some(90.0),
        }
    }

    #[test]
    fn valid_sample_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn rejects_non_finite_and_out_of_range_values() {
        let nan = NewTelemetry {
            temperature: f64::NAN,
            ..sample()
        };
        assert!(nan.validate().is_err());

        let negative_rpm = NewTelemetry {
            speed_rpm: -1.0,
            ..sample()
        };
        assert!(negative_rpm.validate().is_err());

        let battery = NewTelemetry {
            battery_percent: Some(100.5),
            ..sample()
        };
        assert!(battery.validate().is_err());
    }

    #[test]
    fn window_defaults_and_clamps() {
        let default = TelemetryWindow::default();
        assert_eq!(default.limit(), 100);
        assert_eq!(default.hours(), 24);

        let extreme = TelemetryWindow {
            limit: Some(0),
            hours: Some(100_000),
        };
        assert_eq!(extreme.limit(), 1);
        assert_eq!(extreme.hours(), MAX_HISTORY_HOURS);

        let large = TelemetryWindow {
            limit: Some(5000),
            hours: Some(-3),
        };
        assert_eq!(large.limit(), MAX_HISTORY_LIMIT);
        assert_eq!(large.hours(), 1);
    }
}
