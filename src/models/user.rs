//! User model

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Name of the authorization group granted HR rights
pub const HR_GROUP: &str = "HR";

/// Name of the authorization group every invited employee joins
pub const EMPLOYEE_GROUP: &str = "Employee";

/// User account. The email is the only login identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
}

/// Authenticated caller, resolved once per request and passed explicitly
/// into every operation that needs to know who is acting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub groups: BTreeSet<String>,
}

impl Principal {
    pub fn new(user: &User, groups: impl IntoIterator<Item = String>) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            groups: groups.into_iter().collect(),
        }
    }

    pub fn in_group(&self, name: &str) -> bool {
        self.groups.contains(name)
    }
}

/// User as exposed through the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    pub groups: Vec<String>,
}

impl UserPublic {
    pub fn new(user: &User, groups: Vec<String>) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            is_active: user.is_active,
            groups,
        }
    }
}

/// Response of `GET /users/me`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUserResponse {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub groups: Vec<String>,
    pub role: super::Role,
    pub permissions: Vec<String>,
}

/// Login request body
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body returned by login and refresh. The refresh token never appears here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessResponse {
    pub access: String,
}

/// Token verification request; falls back to the access cookie when absent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub token: Option<String>,
}

/// Activation link payload
#[derive(Debug, Clone, Deserialize)]
pub struct ActivationRequest {
    pub uid: String,
    pub token: String,
}

/// Request naming a user by email (invite, resend activation, password reset)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
}

/// Password reset confirmation
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordResetConfirmRequest {
    pub uid: String,
    pub token: String,
    pub new_password: String,
    pub re_new_password: String,
}

/// Password change for the authenticated user
#[derive(Debug, Clone, Deserialize)]
pub struct SetPasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub re_new_password: String,
}
