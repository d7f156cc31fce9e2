//! RBAC (Role-Based Access Control) enforcement
//!
//! Handlers call [`require`] with the operation they perform. The operation's
//! requirement comes from the declarative table in [`crate::models::rbac`].

use tracing::warn;

use crate::{
    models::{requirement_for, Operation, Principal, Requirement, Role},
    services::authorization::effective_role,
    utils::{AppError, AppResult},
};

/// Check that the principal meets the requirement of `operation`
pub fn require(principal: &Principal, operation: Operation) -> AppResult<Role> {
    let role = effective_role(principal);
    let allowed = match requirement_for(operation) {
        // The middleware already resolved a principal; groupless users pass.
        Requirement::Authenticated => true,
        Requirement::HrOrAdmin => matches!(role, Role::Admin | Role::HR),
        Requirement::AdminOnly => role == Role::Admin,
    };

    if allowed {
        Ok(role)
    } else {
        warn!(
            user_id = principal.user_id,
            role = %role,
            operation = operation.as_str(),
            "Permission denied"
        );
        Err(AppError::Authorization(
            "You do not have permission to perform this action.".to_string(),
        ))
    }
}
