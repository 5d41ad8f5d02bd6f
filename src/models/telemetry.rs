//! Telemetry entity model
//!
//! Append-only samples reported for a motor.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Telemetry sample
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "telemetry")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub motor_id: i32,

    /// Winding temperature in degrees Celsius
    pub temperature: f64,

    pub vibration: f64,

    /// Phase current in amperes
    pub current: f64,

    pub speed_rpm: f64,

    pub is_running: bool,

    pub battery_percent: Option<f64>,

    pub created_at: DateTimeWithTimeZone,
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
