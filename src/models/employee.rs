//! Employee model and lifecycle states

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::validation::PHONE_NUMBER_REGEX;

use super::UserPublic;

macro_rules! choice_enum {
    ($(#[$meta:meta])* $name:ident, $label:literal { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok($name::$variant),)+
                    other => Err(format!("\"{}\" is not a valid {}.", other, $label)),
                }
            }
        }
    };
}

choice_enum!(
    /// Gender choices
    Gender, "gender" { Male, Female }
);

choice_enum!(
    /// Marital status choices
    MaritalStatus, "marital status" { Single, Married, Divorced, Widow, Widower }
);

choice_enum!(
    /// Religion choices
    Religion, "religion" { Christian, Muslim, Atheist, Others }
);

/// Employee lifecycle status.
///
/// ```text
/// Draft -> PendingInvite -> Active <-> OnLeave
///                              \         /
///                               Deactivated (terminal)
/// ```
///
/// The status is never stored; it is derived from the employee and user
/// flags by [`EmployeeStatus::derive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    Draft,
    PendingInvite,
    Active,
    OnLeave,
    Deactivated,
}

impl EmployeeStatus {
    /// Status of a persisted employee
    pub fn derive(employee_active: bool, user_active: bool, on_leave: bool) -> Self {
        if !employee_active {
            EmployeeStatus::Deactivated
        } else if !user_active {
            EmployeeStatus::PendingInvite
        } else if on_leave {
            EmployeeStatus::OnLeave
        } else {
            EmployeeStatus::Active
        }
    }

    /// Whether the lifecycle permits moving from `self` to `next`
    pub fn can_transition_to(self, next: EmployeeStatus) -> bool {
        use EmployeeStatus::*;
        matches!(
            (self, next),
            (Draft, PendingInvite)
                | (PendingInvite, Active)
                | (PendingInvite, Deactivated)
                | (Active, OnLeave)
                | (OnLeave, Active)
                | (Active, Deactivated)
                | (OnLeave, Deactivated)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeStatus::Draft => "draft",
            EmployeeStatus::PendingInvite => "pending_invite",
            EmployeeStatus::Active => "active",
            EmployeeStatus::OnLeave => "on_leave",
            EmployeeStatus::Deactivated => "deactivated",
        }
    }
}

impl fmt::Display for EmployeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted employee profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub user_id: i64,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub marital_status: MaritalStatus,
    pub religion: Religion,
    pub nationality: String,
    pub phone_number: String,
    pub address: String,
    pub employee_number: Option<String>,
    pub job_id: i64,
    pub department_id: i64,
    pub employee_type_id: i64,
    pub employment_date: NaiveDate,
    pub resignation_date: Option<NaiveDate>,
    pub is_leave: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Employee number: `<ABBR>-<employment year>-<id padded to 4 digits>`
pub fn format_employee_number(abbreviation: &str, employment_date: NaiveDate, id: i64) -> String {
    use chrono::Datelike;
    format!("{}-{}-{:04}", abbreviation, employment_date.year(), id)
}

/// Email of the account created alongside a new employee
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewEmployeeUser {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
}

/// Payload for `POST /employees`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEmployeeRequest {
    #[validate(nested)]
    pub user: NewEmployeeUser,
    #[validate(length(min = 1, max = 150))]
    pub first_name: String,
    #[validate(length(min = 1, max = 150))]
    pub middle_name: String,
    #[validate(length(min = 1, max = 150))]
    pub last_name: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub marital_status: String,
    pub religion: String,
    pub nationality: String,
    #[validate(
        length(max = 20),
        regex(
            path = *PHONE_NUMBER_REGEX,
            message = "Phone number must be in valid format (+xxxxxxxxxxxxxx)."
        )
    )]
    pub phone_number: String,
    #[validate(length(min = 1, max = 150))]
    pub address: String,
    /// Job title
    #[validate(length(min = 1, max = 50))]
    pub job: String,
    /// Department code
    pub department: String,
    /// Employee type code
    pub employee_type: String,
    pub employment_date: Option<NaiveDate>,
    #[serde(default = "default_send_invite")]
    pub send_invite: bool,
}

fn default_send_invite() -> bool {
    true
}

/// Payload for `PATCH /employees/{employee_number}`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateEmployeeRequest {
    #[validate(length(min = 1, max = 150))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 150))]
    pub middle_name: Option<String>,
    #[validate(length(min = 1, max = 150))]
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub marital_status: Option<String>,
    pub religion: Option<String>,
    pub nationality: Option<String>,
    #[validate(
        length(max = 20),
        regex(
            path = *PHONE_NUMBER_REGEX,
            message = "Phone number must be in valid format (+xxxxxxxxxxxxxx)."
        )
    )]
    pub phone_number: Option<String>,
    #[validate(length(min = 1, max = 150))]
    pub address: Option<String>,
    pub job: Option<String>,
    pub department: Option<String>,
    pub employee_type: Option<String>,
    pub employment_date: Option<NaiveDate>,
}

/// Body of `DELETE /employees/{employee_number}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeactivateEmployeeRequest {
    #[serde(default)]
    pub resignation_date: Option<NaiveDate>,
}

/// Employee as returned by the API, with references resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeResponse {
    pub id: i64,
    pub employee_number: Option<String>,
    pub user: UserPublic,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub marital_status: MaritalStatus,
    pub religion: Religion,
    pub nationality: String,
    pub phone_number: String,
    pub address: String,
    pub job: String,
    pub department: String,
    pub employee_type: String,
    pub employment_date: NaiveDate,
    pub resignation_date: Option<NaiveDate>,
    pub is_leave: bool,
    pub is_active: bool,
    pub status: EmployeeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response of `POST /employees`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedEmployeeResponse {
    #[serde(flatten)]
    pub employee: EmployeeResponse,
    pub invitation_sent: bool,
}
