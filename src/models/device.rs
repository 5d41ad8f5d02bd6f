//! Device entity model
//!
//! Sensor boards that authenticate with a static API key. A device is bound
//! to at most one motor and may only report telemetry for it.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Device credential entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Hardware identifier burned into the board, unique
    #[sea_orm(unique)]
    pub device_uid: String,

    /// Secret presented in `X-API-Key`
    #[sea_orm(unique)]
    pub api_key: String,

    pub motor_id: Option<i32>,

    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    /// Stamped on every authenticated request
    pub last_seen: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::motor::Entity",
        from = "Column::MotorId",
        to = "super::motor::Column::Id",
        on_delete = "SetNull"
    )]
    Motor,
}

impl Related<super::motor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Motor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
