//! # Data Models
//!
//! SeaORM entities for every table in the MotorGuard schema, plus a few
//! response types shared by the service endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod device;
pub mod maintenance_report;
pub mod maintenance_task;
pub mod motor;
pub mod safety_config;
pub mod telemetry;
pub mod user;

pub use device::Entity as Device;
pub use maintenance_report::Entity as MaintenanceReport;
pub use maintenance_task::{Entity as MaintenanceTask, TaskStatus};
pub use motor::Entity as Motor;
pub use safety_config::Entity as SafetyConfig;
pub use telemetry::Entity as Telemetry;
pub use user::{Entity as User, UserRole};

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
    /// Path of the interactive API documentation
    pub docs: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "MotorGuard API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            docs: "/docs".to_string(),
        }
    }
}
