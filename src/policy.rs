//! # Authorization
//!
//! Every role and ownership rule lives in [`decide`]. Handlers resolve the
//! principal, load whatever the rule needs (the task's assignee, the target
//! motor) and call [`authorize`]; they never compare roles themselves.
//!
//! Precedence:
//! 1. inactive principals are denied everything;
//! 2. administrators may perform every user action;
//! 3. technicians may touch a task (or its report) only when assigned to it;
//! 4. technician task listings are scoped through [`task_list_scope`];
//! 5. any active user may read and write motors, telemetry and safety configs;
//! 6. devices may only ingest telemetry for the motor they are bound to.

use metrics::counter;

use crate::error::{ApiError, bad_request, forbidden, invalid_api_key};
use crate::models::{UserRole, device, user};

/// Authenticated actor of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    User {
        id: i32,
        role: UserRole,
        active: bool,
    },
    Device {
        id: i32,
        motor_id: Option<i32>,
        active: bool,
    },
}

impl Principal {
    fn is_active(&self) -> bool {
        match self {
            Principal::User { active, .. } | Principal::Device { active, .. } => *active,
        }
    }
}

impl From<&user::Model> for Principal {
    fn from(user: &user::Model) -> Self {
        Principal::User {
            id: user.id,
            role: user.role,
            active: user.is_active,
        }
    }
}

impl From<&device::Model> for Principal {
    fn from(device: &device::Model) -> Self {
        Principal::Device {
            id: device.id,
            motor_id: device.motor_id,
            active: device.is_active,
        }
    }
}

/// Operation being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ManageUsers,
    ReadSelf,
    ManageDevices,
    ManageMotors,
    ReadMotors,
    ManageSafety,
    ReadSafety,
    CreateTelemetry,
    ReadTelemetry,
    CreateTask,
    ListTasks,
    ReadTask,
    UpdateTaskStatus,
    CreateReport,
    ReadReport,
    IngestDeviceTelemetry,
    ReadMotorStatus,
    SendMotorCommand,
}

impl Action {
    fn is_admin_only(self) -> bool {
        matches!(
            self,
            Action::ManageUsers | Action::ManageDevices | Action::CreateTask
        )
    }

    fn is_task_scoped(self) -> bool {
        matches!(
            self,
            Action::ReadTask | Action::UpdateTaskStatus | Action::CreateReport | Action::ReadReport
        )
    }
}

/// The facts about the target that a rule may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    None,
    Task { assigned_to_user_id: i32 },
    Motor { id: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Inactive,
    AdminRequired,
    NotAssignee,
    DeviceNotBound,
    MotorMismatch,
    /// A device credential was used on a user endpoint.
    UserOnly,
    /// A user credential was used on the device endpoint.
    DeviceOnly,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::Inactive => "inactive",
            DenyReason::AdminRequired => "admin_required",
            DenyReason::NotAssignee => "not_assignee",
            DenyReason::DeviceNotBound => "device_not_bound",
            DenyReason::MotorMismatch => "motor_mismatch",
            DenyReason::UserOnly => "user_only",
            DenyReason::DeviceOnly => "device_only",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

/// Filter a task listing must apply for the principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    All,
    AssignedTo(i32),
    /// Devices see no tasks.
    Nothing,
}

/// Decide whether `principal` may perform `action` on `resource`.
pub fn decide(principal: &Principal, action: Action, resource: &Resource) -> Decision {
    if !principal.is_active() {
        return Decision::Deny(DenyReason::Inactive);
    }

    match *principal {
        Principal::User { id, role, .. } => {
            if action == Action::IngestDeviceTelemetry {
                return Decision::Deny(DenyReason::DeviceOnly);
            }

            if role == UserRole::Admin {
                return Decision::Allow;
            }

            if action.is_admin_only() {
                return Decision::Deny(DenyReason::AdminRequired);
            }

            if action.is_task_scoped() {
                return match resource {
                    Resource::Task {
                        assigned_to_user_id,
                    } if *assigned_to_user_id == id => Decision::Allow,
                    _ => Decision::Deny(DenyReason::NotAssignee),
                };
            }

            Decision::Allow
        }
        Principal::Device { motor_id, .. } => {
            if action != Action::IngestDeviceTelemetry {
                return Decision::Deny(DenyReason::UserOnly);
            }

            match (motor_id, resource) {
                (None, _) => Decision::Deny(DenyReason::DeviceNotBound),
                (Some(bound), Resource::Motor { id }) if bound == *id => Decision::Allow,
                _ => Decision::Deny(DenyReason::MotorMismatch),
            }
        }
    }
}

/// Listing filter for maintenance tasks.
pub fn task_list_scope(principal: &Principal) -> TaskScope {
    match principal {
        Principal::User {
            role: UserRole::Admin,
            ..
        } => TaskScope::All,
        Principal::User { id, .. } => TaskScope::AssignedTo(*id),
        Principal::Device { .. } => TaskScope::Nothing,
    }
}

/// Enforce [`decide`], converting a denial into the matching API error.
pub fn authorize(
    principal: &Principal,
    action: Action,
    resource: &Resource,
) -> Result<(), ApiError> {
    let reason = match decide(principal, action, resource) {
        Decision::Allow => return Ok(()),
        Decision::Deny(reason) => reason,
    };

    counter!("authz_denied_total", "reason" => reason.as_str()).increment(1);
    tracing::info!(
        principal = ?principal,
        action = ?action,
        reason = reason.as_str(),
        "Authorization denied"
    );

    Err(match reason {
        DenyReason::Inactive => bad_request("Inactive user"),
        DenyReason::AdminRequired | DenyReason::NotAssignee => forbidden(None),
        DenyReason::DeviceNotBound => bad_request("Device not associated with a motor"),
        DenyReason::MotorMismatch => forbidden(Some("Motor ID mismatch")),
        DenyReason::UserOnly => invalid_api_key(),
        DenyReason::DeviceOnly => forbidden(Some("Endpoint is reserved for devices")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    const ADMIN: Principal = Principal::User {
        id: 1,
        role: UserRole::Admin,
        active: true,
    };
    const TECH: Principal = Principal::User {
        id: 7,
        role: UserRole::Technician,
        active: true,
    };
    const BOUND_DEVICE: Principal = Principal::Device {
        id: 3,
        motor_id: Some(10),
        active: true,
    };

    fn own_task() -> Resource {
        Resource::Task {
            assigned_to_user_id: 7,
        }
    }

    fn other_task() -> Resource {
        Resource::Task {
            assigned_to_user_id: 8,
        }
    }

    #[test]
    fn inactive_principals_are_denied_everything() {
        let inactive_admin = Principal::User {
            id: 1,
            role: UserRole::Admin,
            active: false,
        };
        let inactive_device = Principal::Device {
            id: 3,
            motor_id: Some(10),
            active: false,
        };

        assert_eq!(
            decide(&inactive_admin, Action::ReadSelf, &Resource::None),
            Decision::Deny(DenyReason::Inactive)
        );
        assert_eq!(
            decide(
                &inactive_device,
                Action::IngestDeviceTelemetry,
                &Resource::Motor { id: 10 }
            ),
            Decision::Deny(DenyReason::Inactive)
        );
    }

    #[test]
    fn admin_may_do_every_user_action() {
        for action in [
            Action::ManageUsers,
            Action::ManageDevices,
            Action::CreateTask,
            Action::ManageSafety,
            Action::UpdateTaskStatus,
            Action::ReadReport,
        ] {
            assert_eq!(decide(&ADMIN, action, &other_task()), Decision::Allow);
        }
    }

    #[test]
    fn technician_cannot_administer() {
        for action in [Action::ManageUsers, Action::ManageDevices, Action::CreateTask] {
            assert_eq!(
                decide(&TECH, action, &Resource::None),
                Decision::Deny(DenyReason::AdminRequired)
            );
        }
    }

    #[test]
    fn technician_task_access_requires_assignment() {
        for action in [
            Action::ReadTask,
            Action::UpdateTaskStatus,
            Action::CreateReport,
            Action::ReadReport,
        ] {
            assert_eq!(decide(&TECH, action, &own_task()), Decision::Allow);
            assert_eq!(
                decide(&TECH, action, &other_task()),
                Decision::Deny(DenyReason::NotAssignee)
            );
        }
    }

    #[test]
    fn technician_may_work_with_motors_and_safety() {
        for action in [
            Action::ManageMotors,
            Action::ReadMotors,
            Action::ManageSafety,
            Action::CreateTelemetry,
            Action::ReadTelemetry,
            Action::SendMotorCommand,
            Action::ListTasks,
            Action::ReadSelf,
        ] {
            assert_eq!(decide(&TECH, action, &Resource::None), Decision::Allow);
        }
    }

    #[test]
    fn task_listing_is_scoped_for_technicians() {
        assert_eq!(task_list_scope(&ADMIN), TaskScope::All);
        assert_eq!(task_list_scope(&TECH), TaskScope::AssignedTo(7));
        assert_eq!(task_list_scope(&BOUND_DEVICE), TaskScope::Nothing);
    }

    #[test]
    fn device_may_only_ingest_for_bound_motor() {
        assert_eq!(
            decide(
                &BOUND_DEVICE,
                Action::IngestDeviceTelemetry,
                &Resource::Motor { id: 10 }
            ),
            Decision::Allow
        );
        assert_eq!(
            decide(
                &BOUND_DEVICE,
                Action::IngestDeviceTelemetry,
                &Resource::Motor { id: 11 }
            ),
            Decision::Deny(DenyReason::MotorMismatch)
        );
        assert_eq!(
            decide(&BOUND_DEVICE, Action::ReadMotors, &Resource::None),
            Decision::Deny(DenyReason::UserOnly)
        );
    }

    #[test]
    fn unbound_device_is_rejected() {
        let unbound = Principal::Device {
            id: 4,
            motor_id: None,
            active: true,
        };
        assert_eq!(
            decide(
                &unbound,
                Action::IngestDeviceTelemetry,
                &Resource::Motor { id: 10 }
            ),
            Decision::Deny(DenyReason::DeviceNotBound)
        );
    }

    #[test]
    fn users_cannot_use_device_ingestion() {
        assert_eq!(
            decide(
                &ADMIN,
                Action::IngestDeviceTelemetry,
                &Resource::Motor { id: 10 }
            ),
            Decision::Deny(DenyReason::DeviceOnly)
        );
    }

    #[test]
    fn denials_map_to_http_errors() {
        let forbidden = authorize(&TECH, Action::ReadTask, &other_task()).unwrap_err();
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

        let mismatch = authorize(
            &BOUND_DEVICE,
            Action::IngestDeviceTelemetry,
            &Resource::Motor { id: 99 },
        )
        .unwrap_err();
        assert_eq!(mismatch.status, StatusCode::FORBIDDEN);
        assert_eq!(mismatch.message, Box::from("Motor ID mismatch"));

        let wrong_scheme =
            authorize(&BOUND_DEVICE, Action::ReadMotors, &Resource::None).unwrap_err();
        assert_eq!(wrong_scheme.status, StatusCode::UNAUTHORIZED);

        assert!(authorize(&ADMIN, Action::ManageUsers, &Resource::None).is_ok());
    }
}
