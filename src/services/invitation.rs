//! Invitation flow
//!
//! Creates an inactive user together with its employee profile, mails a
//! signed activation link and activates the account when the link is used.
//! Password reset reuses the same token machinery.

use chrono::Utc;
use serde_json::{json, Map, Value};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::{
    config::AppConfig,
    db::{
        employee_repository::{EmployeeDetails, EmployeeProfile},
        user_repository::NewUser,
        CatalogRepository, EmployeeRepository, UserRepository,
    },
    models::{
        format_employee_number, CreateEmployeeRequest, EmployeeStatus, PasswordResetConfirmRequest,
        Principal, User, EMPLOYEE_GROUP,
    },
    services::{
        authorization::can_manage_hr_resources,
        mailer::{MailMessage, Mailer, INVITE_TEMPLATE, PASSWORD_RESET_TEMPLATE},
        token::{decode_id, encode_id, ActivationTokenGenerator},
        AuthService,
    },
    utils::{
        validation::{capitalize, normalize_email, validate_country_code, validate_new_password},
        AppError, AppResult,
    },
    AppState,
};

const INVALID_LINK: &str = "Invalid or expired token for the given user.";

/// Result of creating an employee
#[derive(Debug, Clone)]
pub struct CreatedEmployee {
    pub details: EmployeeDetails,
    pub invitation_sent: bool,
}

pub struct InvitationService<'a> {
    pool: &'a SqlitePool,
    config: &'a AppConfig,
    mailer: &'a dyn Mailer,
}

impl<'a> InvitationService<'a> {
    pub fn new(pool: &'a SqlitePool, config: &'a AppConfig, mailer: &'a dyn Mailer) -> Self {
        Self {
            pool,
            config,
            mailer,
        }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(&state.db, &state.config, state.mailer.as_ref())
    }

    fn tokens(&self) -> ActivationTokenGenerator {
        ActivationTokenGenerator::new(
            self.config.auth.jwt_secret.clone(),
            self.config.auth.activation_token_ttl_secs,
        )
    }

    /// Create an inactive user and its employee profile in one transaction,
    /// then optionally send the invitation.
    pub async fn create_employee(
        &self,
        actor: &Principal,
        payload: CreateEmployeeRequest,
    ) -> AppResult<CreatedEmployee> {
        if !can_manage_hr_resources(actor) {
            return Err(AppError::Authorization(
                "You do not have permission to perform this action.".to_string(),
            ));
        }
        payload.validate()?;

        let email = normalize_email(&payload.user.email);
        let profile = self.resolve_profile(&payload).await?;
        let send_invite = payload.send_invite;
        let employment_date = profile.employment_date;

        let mut tx = self.pool.begin().await?;

        let password_hash = AuthService::unusable_password();
        let user_id = UserRepository::insert(
            &mut *tx,
            &NewUser {
                email: &email,
                password_hash: &password_hash,
                is_active: false,
                is_staff: false,
                is_superuser: false,
            },
        )
        .await?;
        UserRepository::add_to_group(&mut *tx, user_id, EMPLOYEE_GROUP).await?;

        let employee_id = EmployeeRepository::insert(&mut *tx, user_id, &profile).await?;
        let employee_number =
            format_employee_number(&self.config.company.abbreviation, employment_date, employee_id);
        EmployeeRepository::assign_employee_number(&mut *tx, employee_id, &employee_number).await?;

        let details = EmployeeRepository::find_by_id_in(&mut *tx, employee_id)
            .await?
            .ok_or_else(|| AppError::Internal("Created employee not found".to_string()))?;

        tx.commit().await?;

        info!(
            actor_id = actor.user_id,
            user_id,
            employee_number = %employee_number,
            "Employee created"
        );

        let invitation_sent = if send_invite {
            match self.send_invitation(&email).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(employee_number = %employee_number, error = %e, "Invitation not sent");
                    false
                }
            }
        } else {
            false
        };

        Ok(CreatedEmployee {
            details,
            invitation_sent,
        })
    }

    /// Map the payload's choice fields and catalog references onto storable values
    async fn resolve_profile(&self, payload: &CreateEmployeeRequest) -> AppResult<EmployeeProfile> {
        let catalog = CatalogRepository::new(self.pool);
        let references = resolve_references(
            &catalog,
            &payload.job,
            &payload.department,
            &payload.employee_type,
        )
        .await?;

        let nationality = payload.nationality.trim().to_uppercase();
        if !validate_country_code(&nationality) {
            return Err(AppError::Validation(format!(
                "\"{}\" is not a valid country code.",
                payload.nationality
            )));
        }

        Ok(EmployeeProfile {
            first_name: capitalize(&payload.first_name),
            middle_name: capitalize(&payload.middle_name),
            last_name: capitalize(&payload.last_name),
            gender: payload.gender.parse().map_err(AppError::Validation)?,
            date_of_birth: payload.date_of_birth,
            marital_status: payload.marital_status.parse().map_err(AppError::Validation)?,
            religion: payload.religion.parse().map_err(AppError::Validation)?,
            nationality,
            phone_number: payload.phone_number.trim().to_string(),
            address: payload.address.trim().to_string(),
            job_id: references.0,
            department_id: references.1,
            employee_type_id: references.2,
            employment_date: payload
                .employment_date
                .unwrap_or_else(|| Utc::now().date_naive()),
        })
    }

    /// Mail an activation link to an inactive user
    pub async fn send_invitation(&self, email: &str) -> AppResult<()> {
        let user = UserRepository::new(self.pool)
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| AppError::NotFound("User with given email does not exist.".to_string()))?;

        if user.is_active {
            return Err(AppError::Conflict("User account is already active.".to_string()));
        }
        if let Some(employee) = EmployeeRepository::new(self.pool)
            .find_by_user_id(user.id)
            .await?
        {
            if !employee.status().can_transition_to(EmployeeStatus::Active) {
                return Err(AppError::Conflict(format!(
                    "Employee cannot be invited from status {}.",
                    employee.status()
                )));
            }
        }

        let message = self.link_message(
            &user,
            INVITE_TEMPLATE,
            "activation_path",
            &self.config.company.activation_path,
        );
        self.mailer
            .send(&message)
            .await
            .map_err(|e| AppError::MailDeliveryFailed(format!("Invitation could not be sent: {}", e)))?;

        info!(user_id = user.id, "Invitation sent");
        Ok(())
    }

    /// Consume an activation link
    pub async fn activate(&self, uid: &str, token: &str) -> AppResult<()> {
        let user_id = decode_id(uid).map_err(|_| AppError::Authentication(INVALID_LINK.to_string()))?;

        let mut tx = self.pool.begin().await?;

        let user = UserRepository::find_by_id_in(&mut *tx, user_id)
            .await?
            .ok_or_else(|| AppError::Authentication(INVALID_LINK.to_string()))?;

        // The token binds the active flag, so a used link fails here as well
        if !self.tokens().check_token(&user, token) {
            warn!(user_id, "Activation rejected: bad token");
            return Err(AppError::Authentication(INVALID_LINK.to_string()));
        }
        if user.is_active {
            return Err(AppError::Conflict("User account is already active.".to_string()));
        }

        if let Some(employee) = EmployeeRepository::find_by_user_id_in(&mut *tx, user_id).await? {
            let next = EmployeeStatus::Active;
            if !employee.status().can_transition_to(next) {
                return Err(AppError::Conflict(format!(
                    "Employee cannot be activated from status {}.",
                    employee.status()
                )));
            }
        }

        if !UserRepository::activate(&mut *tx, user_id).await? {
            return Err(AppError::Conflict("User account is already active.".to_string()));
        }
        tx.commit().await?;

        info!(user_id, "User activated");
        Ok(())
    }

    /// Mail a password reset link to an active user. Unknown and inactive
    /// emails succeed silently.
    pub async fn send_password_reset(&self, email: &str) -> AppResult<()> {
        let user = UserRepository::new(self.pool)
            .find_by_email(&normalize_email(email))
            .await?;
        let Some(user) = user.filter(|u| u.is_active) else {
            debug!("Password reset requested for unknown or inactive email");
            return Ok(());
        };

        let message = self.link_message(
            &user,
            PASSWORD_RESET_TEMPLATE,
            "password_reset_path",
            &self.config.company.password_reset_path,
        );
        self.mailer.send(&message).await.map_err(|e| {
            AppError::MailDeliveryFailed(format!("Password reset mail could not be sent: {}", e))
        })?;

        info!(user_id = user.id, "Password reset mail sent");
        Ok(())
    }

    /// Set a new password from a reset link
    pub async fn confirm_password_reset(&self, req: &PasswordResetConfirmRequest) -> AppResult<()> {
        let user_id =
            decode_id(&req.uid).map_err(|_| AppError::Authentication(INVALID_LINK.to_string()))?;
        let repo = UserRepository::new(self.pool);
        let user = repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Authentication(INVALID_LINK.to_string()))?;

        if !self.tokens().check_token(&user, &req.token) {
            warn!(user_id, "Password reset rejected: bad token");
            return Err(AppError::Authentication(INVALID_LINK.to_string()));
        }

        validate_new_password(
            &req.new_password,
            &req.re_new_password,
            self.config.auth.password_min_length,
        )?;
        let password_hash = AuthService::hash_password(&req.new_password)?;
        repo.set_password(user_id, &password_hash).await?;

        info!(user_id, "Password reset");
        Ok(())
    }

    fn link_message(&self, user: &User, template: &str, path_key: &str, path_template: &str) -> MailMessage {
        let uid = encode_id(user.id);
        let token = self.tokens().make_token(user);
        let company = &self.config.company;

        let mut context = Map::new();
        context.insert("site_name".to_string(), json!(company.site_name));
        context.insert("protocol".to_string(), json!(company.protocol));
        context.insert("domain".to_string(), json!(company.domain));
        context.insert(
            path_key.to_string(),
            Value::String(
                path_template
                    .replace("{uid}", &uid)
                    .replace("{token}", &token),
            ),
        );
        context.insert("uid".to_string(), json!(uid));
        context.insert("token".to_string(), json!(token));
        context.insert("email".to_string(), json!(user.email));

        MailMessage {
            template_name: template.to_string(),
            from_address: self.config.mail.from_address.clone(),
            to_addresses: vec![user.email.clone()],
            context,
        }
    }
}

/// Resolve job title, department code and employee type code to ids.
/// Missing or inactive references are validation errors.
pub(crate) async fn resolve_references(
    catalog: &CatalogRepository<'_>,
    job_title: &str,
    department_code: &str,
    employee_type_code: &str,
) -> AppResult<(i64, i64, i64)> {
    let job = catalog
        .find_job_by_title(job_title)
        .await?
        .filter(|j| j.is_active)
        .ok_or_else(|| missing_reference("title", job_title))?;
    let department = catalog
        .find_department_by_code(department_code)
        .await?
        .filter(|d| d.is_active)
        .ok_or_else(|| missing_reference("code", department_code))?;
    let employee_type = catalog
        .find_employee_type_by_code(employee_type_code)
        .await?
        .filter(|t| t.is_active)
        .ok_or_else(|| missing_reference("code", employee_type_code))?;

    Ok((job.id, department.id, employee_type.id))
}

fn missing_reference(field: &str, value: &str) -> AppError {
    AppError::Validation(format!("Object with {}={} does not exist.", field, value))
}
