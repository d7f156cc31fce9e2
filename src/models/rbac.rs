//! Role-Based Access Control (RBAC) models
//!
//! Effective roles are derived from the staff/superuser flags and group
//! memberships of a [`Principal`](super::Principal). Each API operation names
//! the requirement it needs in [`OPERATION_POLICIES`].

use serde::{Deserialize, Serialize};

/// Effective role of a caller, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[serde(rename = "hr")]
    HR,
    Employee,
    Anonymous,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::HR => "hr",
            Role::Employee => "employee",
            Role::Anonymous => "anonymous",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations exposed by the API that are subject to authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CreateEmployee,
    ListEmployees,
    RetrieveEmployee,
    UpdateEmployee,
    InviteEmployee,
    ChangeLeave,
    DeactivateEmployee,
    ViewOwnEmployee,
    CurrentUser,
    SetPassword,
    ListUsers,
    DeleteUser,
    ResendActivation,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateEmployee => "create_employee",
            Operation::ListEmployees => "list_employees",
            Operation::RetrieveEmployee => "retrieve_employee",
            Operation::UpdateEmployee => "update_employee",
            Operation::InviteEmployee => "invite_employee",
            Operation::ChangeLeave => "change_leave",
            Operation::DeactivateEmployee => "deactivate_employee",
            Operation::ViewOwnEmployee => "view_own_employee",
            Operation::CurrentUser => "current_user",
            Operation::SetPassword => "set_password",
            Operation::ListUsers => "list_users",
            Operation::DeleteUser => "delete_user",
            Operation::ResendActivation => "resend_activation",
        }
    }
}

/// What a caller must be to perform an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any authenticated principal; object-level checks may follow
    Authenticated,
    /// Admin or member of the HR group
    HrOrAdmin,
    /// Staff or superuser
    AdminOnly,
}

/// Operation to requirement table, evaluated once per request.
pub const OPERATION_POLICIES: &[(Operation, Requirement)] = &[
    (Operation::CreateEmployee, Requirement::HrOrAdmin),
    (Operation::ListEmployees, Requirement::HrOrAdmin),
    (Operation::RetrieveEmployee, Requirement::HrOrAdmin),
    (Operation::UpdateEmployee, Requirement::HrOrAdmin),
    (Operation::InviteEmployee, Requirement::HrOrAdmin),
    (Operation::ChangeLeave, Requirement::HrOrAdmin),
    (Operation::DeactivateEmployee, Requirement::Authenticated),
    (Operation::ViewOwnEmployee, Requirement::Authenticated),
    (Operation::CurrentUser, Requirement::Authenticated),
    (Operation::SetPassword, Requirement::Authenticated),
    (Operation::ListUsers, Requirement::AdminOnly),
    (Operation::DeleteUser, Requirement::AdminOnly),
    (Operation::ResendActivation, Requirement::AdminOnly),
];

/// Look up the requirement of an operation. Unlisted operations need Admin.
pub fn requirement_for(operation: Operation) -> Requirement {
    OPERATION_POLICIES
        .iter()
        .find(|(op, _)| *op == operation)
        .map(|(_, req)| *req)
        .unwrap_or(Requirement::AdminOnly)
}
