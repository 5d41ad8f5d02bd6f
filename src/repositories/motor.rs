//! # Motor Repository
//!
//! CRUD over motors. Deleting a motor cascades to its telemetry, tasks,
//! reports and safety config, and unbinds any device pointing at it.

use crate::error::RepositoryError;
use crate::models::motor::{ActiveModel, Column, Entity as Motor, Model as MotorModel};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, Set,
};

use super::{optional_text, require_text};

/// Request data for registering a motor
#[derive(Debug, Clone, Default)]
pub struct NewMotor {
    pub name: String,
    pub code: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub device_uid: Option<String>,
}

/// Updatable motor fields; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct MotorPatch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub device_uid: Option<String>,
}

/// Repository for Motor database operations
pub struct MotorRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> MotorRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Register a new motor; the code must be unique
    pub async fn create(&self, request: NewMotor) -> Result<MotorModel, RepositoryError> {
        let name = require_text("name", &request.name)?;
        let code = require_text("code", &request.code)?;

        if self.find_by_code(&code).await?.is_some() {
            return Err(RepositoryError::conflict("Motor code already exists"));
        }

        let motor = ActiveModel {
            name: Set(name),
            code: Set(code),
            location: Set(optional_text(request.location)),
            description: Set(optional_text(request.description)),
            device_uid: Set(optional_text(request.device_uid)),
            is_running: Set(false),
            last_temperature: Set(None),
            last_vibration: Set(None),
            last_current: Set(None),
            last_speed_rpm: Set(None),
            last_battery_percent: Set(None),
            last_update: Set(None),
            ..Default::default()
        };

        let created = motor
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(motor_id = created.id, code = %created.code, "Motor registered");
        Ok(created)
    }

    pub async fn list(&self) -> Result<Vec<MotorModel>, RepositoryError> {
        Motor::find()
            .order_by_asc(Column::Id)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_id(&self, motor_id: i32) -> Result<Option<MotorModel>, RepositoryError> {
        Motor::find_by_id(motor_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, motor_id: i32) -> Result<MotorModel, RepositoryError> {
        self.find_by_id(motor_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Motor not found"))
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<MotorModel>, RepositoryError> {
        Motor::find()
            .filter(Column::Code.eq(code.trim()))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_device_uid(
        &self,
        device_uid: &str,
    ) -> Result<Option<MotorModel>, RepositoryError> {
        Motor::find()
            .filter(Column::DeviceUid.eq(device_uid.trim()))
            .order_by_asc(Column::Id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Apply the fields present in `patch`
    pub async fn update(
        &self,
        motor_id: i32,
        patch: MotorPatch,
    ) -> Result<MotorModel, RepositoryError> {
        let mut motor = self.get(motor_id).await?.into_active_model();

        if let Some(name) = patch.name {
            motor.name = Set(require_text("name", &name)?);
        }
        if let Some(location) = patch.location {
            motor.location = Set(optional_text(Some(location)));
        }
        if let Some(description) = patch.description {
            motor.description = Set(optional_text(Some(description)));
        }
        if let Some(device_uid) = patch.device_uid {
            motor.device_uid = Set(optional_text(Some(device_uid)));
        }

        if !motor.is_changed() {
            return self.get(motor_id).await;
        }

        motor
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, motor_id: i32) -> Result<(), RepositoryError> {
        let motor = self.get(motor_id).await?;
        motor
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(motor_id, "Motor deleted");
        Ok(())
    }

    /// Simulated run/stop command: updates the running flag and cached speed
    pub async fn apply_command(
        &self,
        motor: MotorModel,
        running: bool,
        speed_rpm: Option<f64>,
    ) -> Result<MotorModel, RepositoryError> {
        let mut motor = motor.into_active_model();
        motor.is_running = Set(running);
        if let Some(rpm) = speed_rpm {
            motor.last_speed_rpm = Set(Some(rpm));
        }
        motor.last_update = Set(Some(Utc::now().fixed_offset()));

        motor
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}
