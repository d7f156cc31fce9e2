//! Organisation catalog: jobs, departments and employee types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a department code
pub const DEPARTMENT_CODE_MAX: usize = 5;

/// Maximum length of an employee type code
pub const EMPLOYEE_TYPE_CODE_MAX: usize = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub description: String,
    /// Employee heading the department; one department per head
    pub head_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeType {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Department or employee type to create
#[derive(Debug, Clone, Deserialize)]
pub struct NewCodedRecord {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
}

/// Fixture file loaded by `--load-fixtures`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFixtures {
    #[serde(default)]
    pub jobs: Vec<NewJob>,
    #[serde(default)]
    pub departments: Vec<NewCodedRecord>,
    #[serde(default)]
    pub employee_types: Vec<NewCodedRecord>,
}
