//! SafetyConfig entity model
//!
//! Alarm thresholds for a motor; one row per motor.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

pub const DEFAULT_MAX_TEMPERATURE: f64 = 80.0;
pub const DEFAULT_MAX_VIBRATION: f64 = 5.0;
pub const DEFAULT_MIN_BATTERY_PERCENT: f64 = 20.0;
pub const DEFAULT_EMERGENCY_STOP_DELAY_SECONDS: i32 = 5;

/// Safety thresholds entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "safety_configs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub motor_id: i32,

    pub max_temperature: f64,

    pub max_vibration: f64,

    pub min_battery_percent: f64,

    pub emergency_stop_delay_seconds: i32,

    /// Stored only; no SMS is ever sent
    pub enable_sms_alerts: bool,

    pub sms_phone_number: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::motor::Entity",
        from = "Column::MotorId",
        to = "super::motor::Column::Id",
        on_delete = "Cascade"
    )]
    Motor,
}

impl Related<super::motor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Motor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
