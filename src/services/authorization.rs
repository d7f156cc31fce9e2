//! Authorization lookup
//!
//! Turns a principal's staff/superuser flags and group memberships into an
//! effective role and permission set.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::{
    db::UserRepository,
    models::{Employee, Principal, Role, EMPLOYEE_GROUP, HR_GROUP},
};

/// Effective role, by precedence: Admin, HR, Employee, Anonymous
pub fn effective_role(principal: &Principal) -> Role {
    if principal.is_staff || principal.is_superuser {
        Role::Admin
    } else if principal.in_group(HR_GROUP) {
        Role::HR
    } else if principal.in_group(EMPLOYEE_GROUP) {
        Role::Employee
    } else {
        Role::Anonymous
    }
}

pub fn can_manage_hr_resources(principal: &Principal) -> bool {
    matches!(effective_role(principal), Role::Admin | Role::HR)
}

pub fn can_access_own_employee_record(principal: &Principal, employee: &Employee) -> bool {
    effective_role(principal) == Role::Admin || employee.user_id == principal.user_id
}

/// Permission codenames held by the principal. Admins hold every permission.
pub async fn effective_permissions(pool: &SqlitePool, principal: &Principal) -> Result<Vec<String>> {
    let repo = UserRepository::new(pool);
    if effective_role(principal) == Role::Admin {
        repo.all_permissions().await
    } else {
        repo.group_permissions_for(principal.user_id).await
    }
}
