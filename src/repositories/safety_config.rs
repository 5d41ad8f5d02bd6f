//! # Safety Config Repository
//!
//! One threshold set per motor. Values are validated after defaults and
//! patches are applied, so a partial update can never leave the row invalid.

use crate::error::RepositoryError;
use crate::models::motor::Entity as Motor;
use crate::models::safety_config::{
    ActiveModel, Column, DEFAULT_EMERGENCY_STOP_DELAY_SECONDS, DEFAULT_MAX_TEMPERATURE,
    DEFAULT_MAX_VIBRATION, DEFAULT_MIN_BATTERY_PERCENT, Entity as SafetyConfig,
    Model as SafetyConfigModel,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};

use super::optional_text;

/// Request data for a motor's thresholds; omitted values take the defaults.
#[derive(Debug, Clone, Default)]
pub struct NewSafetyConfig {
    pub motor_id: i32,
    pub max_temperature: Option<f64>,
    pub max_vibration: Option<f64>,
    pub min_battery_percent: Option<f64>,
    pub emergency_stop_delay_seconds: Option<i32>,
    pub enable_sms_alerts: Option<bool>,
    pub sms_phone_number: Option<String>,
}

/// Updatable thresholds; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct SafetyConfigPatch {
    pub max_temperature: Option<f64>,
    pub max_vibration: Option<f64>,
    pub min_battery_percent: Option<f64>,
    pub emergency_stop_delay_seconds: Option<i32>,
    pub enable_sms_alerts: Option<bool>,
    pub sms_phone_number: Option<String>,
}

struct Thresholds<'t> {
    max_temperature: f64,
    max_vibration: f64,
    min_battery_percent: f64,
    emergency_stop_delay_seconds: i32,
    enable_sms_alerts: bool,
    sms_phone_number: Option<&'t str>,
}

impl Thresholds<'_> {
    fn validate(&self) -> Result<(), RepositoryError> {
        if !(self.max_temperature.is_finite() && self.max_temperature > 0.0) {
            return Err(RepositoryError::invalid_field(
                "max_temperature",
                "max_temperature must be a positive number",
            ));
        }
        if !(self.max_vibration.is_finite() && self.max_vibration > 0.0) {
            return Err(RepositoryError::invalid_field(
                "max_vibration",
                "max_vibration must be a positive number",
            ));
        }
        if !(0.0..=100.0).contains(&self.min_battery_percent) {
            return Err(RepositoryError::invalid_field(
                "min_battery_percent",
                "min_battery_percent must be between 0 and 100",
            ));
        }
        if self.emergency_stop_delay_seconds < 0 {
            return Err(RepositoryError::invalid_field(
                "emergency_stop_delay_seconds",
                "emergency_stop_delay_seconds must not be negative",
            ));
        }
        if self.enable_sms_alerts && self.sms_phone_number.is_none() {
            return Err(RepositoryError::invalid_field(
                "sms_phone_number",
                "sms_phone_number is required when SMS alerts are enabled",
            ));
        }
        Ok(())
    }
}

/// Repository for SafetyConfig database operations
pub struct SafetyConfigRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> SafetyConfigRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        request: NewSafetyConfig,
    ) -> Result<SafetyConfigModel, RepositoryError> {
        let sms_phone_number = optional_text(request.sms_phone_number);
        let thresholds = Thresholds {
            max_temperature: request.max_temperature.unwrap_or(DEFAULT_MAX_TEMPERATURE),
            max_vibration: request.max_vibration.unwrap_or(DEFAULT_MAX_VIBRATION),
            min_battery_percent: request
                .min_battery_percent
                .unwrap_or(DEFAULT_MIN_BATTERY_PERCENT),
            emergency_stop_delay_seconds: request
                .emergency_stop_delay_seconds
                .unwrap_or(DEFAULT_EMERGENCY_STOP_DELAY_SECONDS),
            enable_sms_alerts: request.enable_sms_alerts.unwrap_or(false),
            sms_phone_number: sms_phone_number.as_deref(),
        };
        thresholds.validate()?;

        Motor::find_by_id(request.motor_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Motor not found"))?;

        if self.find_by_motor(request.motor_id).await?.is_some() {
            return Err(RepositoryError::conflict(
                "Safety config already exists for this motor",
            ));
        }

        let config = ActiveModel {
            motor_id: Set(request.motor_id),
            max_temperature: Set(thresholds.max_temperature),
            max_vibration: Set(thresholds.max_vibration),
            min_battery_percent: Set(thresholds.min_battery_percent),
            emergency_stop_delay_seconds: Set(thresholds.emergency_stop_delay_seconds),
            enable_sms_alerts: Set(thresholds.enable_sms_alerts),
            sms_phone_number: Set(sms_phone_number.clone()),
            created_at: Set(Utc::now().fixed_offset()),
            updated_at: Set(None),
            ..Default::default()
        };

        let created = config
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(motor_id = created.motor_id, "Safety config created");
        Ok(created)
    }

    pub async fn find_by_motor(
        &self,
        motor_id: i32,
    ) -> Result<Option<SafetyConfigModel>, RepositoryError> {
        SafetyConfig::find()
            .filter(Column::MotorId.eq(motor_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get_by_motor(&self, motor_id: i32) -> Result<SafetyConfigModel, RepositoryError> {
        self.find_by_motor(motor_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Safety config not found for this motor"))
    }

    /// Apply the present fields of `patch`, validating the merged result
    pub async fn update(
        &self,
        motor_id: i32,
        patch: SafetyConfigPatch,
    ) -> Result<SafetyConfigModel, RepositoryError> {
        let existing = self.get_by_motor(motor_id).await?;

        let sms_phone_number = match patch.sms_phone_number {
            Some(phone) => optional_text(Some(phone)),
            None => existing.sms_phone_number.clone(),
        };
        let merged = Thresholds {
            max_temperature: patch.max_temperature.unwrap_or(existing.max_temperature),
            max_vibration: patch.max_vibration.unwrap_or(existing.max_vibration),
            min_battery_percent: patch
                .min_battery_percent
                .unwrap_or(existing.min_battery_percent),
            emergency_stop_delay_seconds: patch
                .emergency_stop_delay_seconds
                .unwrap_or(existing.emergency_stop_delay_seconds),
            enable_sms_alerts: patch.enable_sms_alerts.unwrap_or(existing.enable_sms_alerts),
            sms_phone_number: sms_phone_number.as_deref(),
        };
        merged.validate()?;

        let mut config = existing.into_active_model();
        config.max_temperature = Set(merged.max_temperature);
        config.max_vibration = Set(merged.max_vibration);
        config.min_battery_percent = Set(merged.min_battery_percent);
        config.emergency_stop_delay_seconds = Set(merged.emergency_stop_delay_seconds);
        config.enable_sms_alerts = Set(merged.enable_sms_alerts);
        config.sms_phone_number = Set(sms_phone_number.clone());
        config.updated_at = Set(Some(Utc::now().fixed_offset()));

        config
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}
