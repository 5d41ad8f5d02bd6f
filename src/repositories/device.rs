//! # Device Repository
//!
//! Sensor-board credentials. API keys are generated server-side and rotated
//! with a single `UPDATE`, so the old key stops matching the moment the
//! statement commits.

use crate::crypto;
use crate::error::RepositoryError;
use crate::models::device::{ActiveModel, Column, Entity as Device, Model as DeviceModel};
use crate::models::motor::Entity as Motor;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, Set,
};

use super::require_text;

/// Repository for Device database operations
pub struct DeviceRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> DeviceRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Register a device and issue its first API key
    pub async fn create(
        &self,
        device_uid: &str,
        motor_id: Option<i32>,
    ) -> Result<DeviceModel, RepositoryError> {
        let device_uid = require_text("device_uid", device_uid)?;

        if self.find_by_uid(&device_uid).await?.is_some() {
            return Err(RepositoryError::conflict("Device UID already registered"));
        }

        if let Some(motor_id) = motor_id {
            self.ensure_motor(motor_id).await?;
        }

        let device = ActiveModel {
            device_uid: Set(device_uid),
            api_key: Set(crypto::generate_api_key()),
            motor_id: Set(motor_id),
            is_active: Set(true),
            created_at: Set(Utc::now().fixed_offset()),
            last_seen: Set(None),
            ..Default::default()
        };

        let created = device
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(
            device_id = created.id,
            device_uid = %created.device_uid,
            motor_id = ?created.motor_id,
            "Device registered"
        );
        Ok(created)
    }

    /// All devices, newest first
    pub async fn list(&self) -> Result<Vec<DeviceModel>, RepositoryError> {
        Device::find()
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, device_id: i32) -> Result<DeviceModel, RepositoryError> {
        Device::find_by_id(device_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Device not found"))
    }

    pub async fn find_by_uid(
        &self,
        device_uid: &str,
    ) -> Result<Option<DeviceModel>, RepositoryError> {
        Device::find()
            .filter(Column::DeviceUid.eq(device_uid.trim()))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Active device holding exactly this key
    pub async fn find_active_by_api_key(
        &self,
        api_key: &str,
    ) -> Result<Option<DeviceModel>, RepositoryError> {
        Device::find()
            .filter(Column::ApiKey.eq(api_key))
            .filter(Column::IsActive.eq(true))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Stamp `last_seen` with the current time
    pub async fn touch_last_seen(&self, device_id: i32) -> Result<(), RepositoryError> {
        Device::update_many()
            .col_expr(Column::LastSeen, Expr::value(Utc::now().fixed_offset()))
            .filter(Column::Id.eq(device_id))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }

    pub async fn bind_motor(
        &self,
        device_id: i32,
        motor_id: i32,
    ) -> Result<DeviceModel, RepositoryError> {
        let device = self.get(device_id).await?;
        self.ensure_motor(motor_id).await?;

        let mut device = device.into_active_model();
        device.motor_id = Set(Some(motor_id));

        let updated = device
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(device_id, motor_id, "Device bound to motor");
        Ok(updated)
    }

    /// Replace the API key in one statement and return the updated device
    pub async fn regenerate_api_key(&self, device_id: i32) -> Result<DeviceModel, RepositoryError> {
        let result = Device::update_many()
            .col_expr(Column::ApiKey, Expr::value(crypto::generate_api_key()))
            .filter(Column::Id.eq(device_id))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found("Device not found"));
        }

        tracing::info!(device_id, "Device API key rotated");
        self.get(device_id).await
    }

    pub async fn set_active(
        &self,
        device_id: i32,
        is_active: bool,
    ) -> Result<DeviceModel, RepositoryError> {
        let mut device = self.get(device_id).await?.into_active_model();
        device.is_active = Set(is_active);

        let updated = device
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(device_id, is_active, "Device activation changed");
        Ok(updated)
    }

    pub async fn delete(&self, device_id: i32) -> Result<(), RepositoryError> {
        let device = self.get(device_id).await?;
        device
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(device_id, "Device deleted");
        Ok(())
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
