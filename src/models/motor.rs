//! Motor entity model
//!
//! The `last_*` columns cache the most recent telemetry sample so status reads
//! never scan the telemetry history.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Motor entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "motors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    /// Plant-wide motor code (e.g. `M001`), unique
    #[sea_orm(unique)]
    pub code: String,

    pub location: Option<String>,

    pub description: Option<String>,

    /// Identifier of the sensor board mounted on the motor, if any
    pub device_uid: Option<String>,

    pub is_running: bool,

    pub last_temperature: Option<f64>,

    pub last_vibration: Option<f64>,

    pub last_current: Option<f64>,

    pub last_speed_rpm: Option<f64>,

    pub last_battery_percent: Option<f64>,

    /// When the cached snapshot was last refreshed
    pub last_update: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::telemetry::Entity")]
    Telemetry,
    #[sea_orm(has_many = "super::maintenance_task::Entity")]
    MaintenanceTask,
    #[sea_orm(has_one = "super::safety_config::Entity")]
    SafetyConfig,
}

impl Related<super::telemetry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Telemetry.def()
    }
}

impl Related<super::maintenance_task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MaintenanceTask.def()
    }
}

impl Related<super::safety_config::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SafetyConfig.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
