//! Employee lifecycle
//!
//! Status transitions after an employee exists: leave, return from leave and
//! the terminal deactivation, plus record maintenance. Every transition is
//! checked against [`EmployeeStatus::can_transition_to`].

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::info;
use validator::Validate;

use crate::{
    db::{
        employee_repository::{EmployeeDetails, EmployeeProfile},
        CatalogRepository, EmployeeRepository, UserRepository,
    },
    models::{EmployeeStatus, Principal, UpdateEmployeeRequest},
    services::{
        authorization::{can_access_own_employee_record, can_manage_hr_resources},
        invitation::resolve_references,
    },
    utils::{
        validation::{capitalize, validate_country_code},
        AppError, AppResult,
    },
    AppState,
};

/// What a deactivation did besides the employee row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deactivation {
    /// The actor deactivated their own account; their session must end
    pub self_deactivated: bool,
}

pub struct LifecycleService<'a> {
    pool: &'a SqlitePool,
}

impl<'a> LifecycleService<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(&state.db)
    }

    pub async fn list(&self) -> AppResult<Vec<EmployeeDetails>> {
        Ok(EmployeeRepository::new(self.pool).list().await?)
    }

    pub async fn get(&self, employee_number: &str) -> AppResult<EmployeeDetails> {
        EmployeeRepository::new(self.pool)
            .find_by_number(employee_number)
            .await?
            .ok_or_else(not_found)
    }

    /// The caller's own employee record
    pub async fn own_record(&self, actor: &Principal) -> AppResult<EmployeeDetails> {
        EmployeeRepository::new(self.pool)
            .find_by_user_id(actor.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User has no employee attached with it".to_string()))
    }

    /// A record the caller may read: their own, or any for an Admin
    pub async fn record_for(&self, actor: &Principal, employee_number: &str) -> AppResult<EmployeeDetails> {
        let details = self.get(employee_number).await?;
        if !can_access_own_employee_record(actor, &details.employee) {
            return Err(forbidden());
        }
        Ok(details)
    }

    /// Edit profile fields. The employee number never changes, even when
    /// the employment date does.
    pub async fn update(
        &self,
        actor: &Principal,
        employee_number: &str,
        changes: UpdateEmployeeRequest,
    ) -> AppResult<EmployeeDetails> {
        if !can_manage_hr_resources(actor) {
            return Err(forbidden());
        }
        changes.validate()?;

        let current = self.get(employee_number).await?;
        let mut profile = EmployeeProfile::from_employee(&current.employee);

        if let Some(v) = changes.first_name {
            profile.first_name = capitalize(&v);
        }
        if let Some(v) = changes.middle_name {
            profile.middle_name = capitalize(&v);
        }
        if let Some(v) = changes.last_name {
            profile.last_name = capitalize(&v);
        }
        if let Some(v) = changes.gender {
            profile.gender = v.parse().map_err(AppError::Validation)?;
        }
        if let Some(v) = changes.date_of_birth {
            profile.date_of_birth = v;
        }
        if let Some(v) = changes.marital_status {
            profile.marital_status = v.parse().map_err(AppError::Validation)?;
        }
        if let Some(v) = changes.religion {
            profile.religion = v.parse().map_err(AppError::Validation)?;
        }
        if let Some(v) = changes.nationality {
            let code = v.trim().to_uppercase();
            if !validate_country_code(&code) {
                return Err(AppError::Validation(format!(
                    "\"{}\" is not a valid country code.",
                    v
                )));
            }
            profile.nationality = code;
        }
        if let Some(v) = changes.phone_number {
            profile.phone_number = v.trim().to_string();
        }
        if let Some(v) = changes.address {
            profile.address = v.trim().to_string();
        }
        if let Some(v) = changes.employment_date {
            profile.employment_date = v;
        }

        if changes.job.is_some() || changes.department.is_some() || changes.employee_type.is_some() {
            let (job_id, department_id, employee_type_id) = resolve_references(
                &CatalogRepository::new(self.pool),
                changes.job.as_deref().unwrap_or(&current.job_title),
                changes.department.as_deref().unwrap_or(&current.department_code),
                changes
                    .employee_type
                    .as_deref()
                    .unwrap_or(&current.employee_type_code),
            )
            .await?;
            profile.job_id = job_id;
            profile.department_id = department_id;
            profile.employee_type_id = employee_type_id;
        }

        let repo = EmployeeRepository::new(self.pool);
        repo.update_profile(current.employee.id, &profile).await?;

        info!(
            actor_id = actor.user_id,
            employee_number = %employee_number,
            "Employee updated"
        );
        self.get(employee_number).await
    }

    /// `Active -> OnLeave` (`on_leave = true`) or `OnLeave -> Active`
    pub async fn set_leave(
        &self,
        actor: &Principal,
        employee_number: &str,
        on_leave: bool,
    ) -> AppResult<EmployeeDetails> {
        if !can_manage_hr_resources(actor) {
            return Err(forbidden());
        }
        let current = self.get(employee_number).await?;
        let (from, to) = if on_leave {
            (EmployeeStatus::Active, EmployeeStatus::OnLeave)
        } else {
            (EmployeeStatus::OnLeave, EmployeeStatus::Active)
        };

        let status = current.status();
        if status != from || !status.can_transition_to(to) {
            return Err(AppError::Conflict(format!(
                "Employee cannot move from {} to {}.",
                status, to
            )));
        }

        let changed = EmployeeRepository::new(self.pool)
            .set_leave(current.employee.id, on_leave)
            .await?;
        if !changed {
            return Err(AppError::Conflict(format!(
                "Employee cannot move from {} to {}.",
                status, to
            )));
        }

        info!(
            actor_id = actor.user_id,
            employee_number = %employee_number,
            status = %to,
            "Employee leave status changed"
        );
        self.get(employee_number).await
    }

    /// Terminal soft delete of an employee and its user account, in one
    /// transaction. HR and Admin may deactivate anyone; an employee may
    /// deactivate themselves.
    pub async fn deactivate(
        &self,
        actor: &Principal,
        employee_number: &str,
        resignation_date: Option<NaiveDate>,
    ) -> AppResult<Deactivation> {
        let current = self.get(employee_number).await?;
        let is_self = current.employee.user_id == actor.user_id;
        if !(can_manage_hr_resources(actor) || is_self) {
            return Err(forbidden());
        }

        self.deactivate_details(actor, &current, resignation_date)
            .await
            .map(|()| Deactivation {
                self_deactivated: is_self,
            })
    }

    /// Deactivate a user account. A linked employee is deactivated with it so
    /// no active user is left behind a deactivated employee, or the reverse.
    pub async fn deactivate_user(&self, actor: &Principal, user_id: i64) -> AppResult<Deactivation> {
        let users = UserRepository::new(self.pool);
        let user = users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let self_deactivated = user.id == actor.user_id;

        match EmployeeRepository::new(self.pool).find_by_user_id(user.id).await? {
            Some(details) if details.employee.is_active => {
                self.deactivate_details(actor, &details, None).await?;
            }
            _ => {
                let mut conn = self.pool.acquire().await?;
                UserRepository::deactivate(&mut *conn, user.id).await?;
                info!(actor_id = actor.user_id, user_id = user.id, "User deactivated");
            }
        }

        Ok(Deactivation { self_deactivated })
    }

    async fn deactivate_details(
        &self,
        actor: &Principal,
        details: &EmployeeDetails,
        resignation_date: Option<NaiveDate>,
    ) -> AppResult<()> {
        let status = details.status();
        if !status.can_transition_to(EmployeeStatus::Deactivated) {
            return Err(AppError::Conflict("Employee is already inactive.".to_string()));
        }
        let resignation_date = resignation_date.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.pool.begin().await?;
        if !EmployeeRepository::deactivate(&mut *tx, details.employee.id, resignation_date).await? {
            return Err(AppError::Conflict("Employee is already inactive.".to_string()));
        }
        UserRepository::deactivate(&mut *tx, details.employee.user_id).await?;
        tx.commit().await?;

        info!(
            actor_id = actor.user_id,
            user_id = details.employee.user_id,
            employee_number = details.employee.employee_number.as_deref().unwrap_or_default(),
            resignation_date = %resignation_date,
            "Employee deactivated"
        );
        Ok(())
    }
}

fn not_found() -> AppError {
    AppError::NotFound("No Employee matches the given query.".to_string())
}

fn forbidden() -> AppError {
    AppError::Authorization("You do not have permission to perform this action.".to_string())
}
