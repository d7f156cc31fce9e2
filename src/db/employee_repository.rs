//! Employee repository
//!
//! Reads join the linked user and catalog rows so callers get a complete
//! [`EmployeeDetails`] in one query. Writes that belong to a multi-step
//! operation take an open connection so they can run inside a transaction.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use super::{parse_db_date, parse_db_timestamp};
use crate::models::{
    Employee, EmployeeResponse, EmployeeStatus, Gender, MaritalStatus, Religion, UserPublic,
};

#[derive(Debug, sqlx::FromRow)]
struct EmployeeRow {
    id: i64,
    user_id: i64,
    first_name: String,
    middle_name: String,
    last_name: String,
    gender: String,
    date_of_birth: String,
    marital_status: String,
    religion: String,
    nationality: String,
    phone_number: String,
    address: String,
    employee_number: Option<String>,
    job_id: i64,
    department_id: i64,
    employee_type_id: i64,
    employment_date: String,
    resignation_date: Option<String>,
    is_leave: bool,
    is_active: bool,
    created_at: String,
    updated_at: String,
    user_email: String,
    user_is_active: bool,
    user_groups: Option<String>,
    job_title: String,
    department_code: String,
    employee_type_code: String,
}

const SELECT_EMPLOYEE: &str = r#"
    SELECT e.id, e.user_id, e.first_name, e.middle_name, e.last_name, e.gender,
           e.date_of_birth, e.marital_status, e.religion, e.nationality,
           e.phone_number, e.address, e.employee_number, e.job_id, e.department_id,
           e.employee_type_id, e.employment_date, e.resignation_date, e.is_leave,
           e.is_active, e.created_at, e.updated_at,
           u.email AS user_email,
           u.is_active AS user_is_active,
           (SELECT group_concat(g.name, ',')
              FROM user_groups ug
              INNER JOIN auth_groups g ON g.id = ug.group_id
             WHERE ug.user_id = u.id) AS user_groups,
           j.title AS job_title,
           d.code AS department_code,
           t.code AS employee_type_code
    FROM employees e
    INNER JOIN users u ON u.id = e.user_id
    INNER JOIN jobs j ON j.id = e.job_id
    INNER JOIN departments d ON d.id = e.department_id
    INNER JOIN employee_types t ON t.id = e.employee_type_id
"#;

/// An employee with its linked user and resolved catalog references
#[derive(Debug, Clone)]
pub struct EmployeeDetails {
    pub employee: Employee,
    pub user_email: String,
    pub user_is_active: bool,
    pub user_groups: Vec<String>,
    pub job_title: String,
    pub department_code: String,
    pub employee_type_code: String,
}

impl EmployeeDetails {
    pub fn status(&self) -> EmployeeStatus {
        EmployeeStatus::derive(
            self.employee.is_active,
            self.user_is_active,
            self.employee.is_leave,
        )
    }

    pub fn into_response(self) -> EmployeeResponse {
        let status = self.status();
        let e = self.employee;
        EmployeeResponse {
            id: e.id,
            employee_number: e.employee_number,
            user: UserPublic {
                id: e.user_id,
                email: self.user_email,
                is_active: self.user_is_active,
                groups: self.user_groups,
            },
            first_name: e.first_name,
            middle_name: e.middle_name,
            last_name: e.last_name,
            gender: e.gender,
            date_of_birth: e.date_of_birth,
            marital_status: e.marital_status,
            religion: e.religion,
            nationality: e.nationality,
            phone_number: e.phone_number,
            address: e.address,
            job: self.job_title,
            department: self.department_code,
            employee_type: self.employee_type_code,
            employment_date: e.employment_date,
            resignation_date: e.resignation_date,
            is_leave: e.is_leave,
            is_active: e.is_active,
            status,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

/// Writable employee fields
#[derive(Debug, Clone)]
pub struct EmployeeProfile {
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
    pub job_id: i64,
    pub department_id: i64,
    pub employee_type_id: i64,
    pub employment_date: NaiveDate,
}

impl EmployeeProfile {
    pub fn from_employee(e: &Employee) -> Self {
        Self {
            first_name: e.first_name.clone(),
            middle_name: e.middle_name.clone(),
            last_name: e.last_name.clone(),
            gender: e.gender,
            date_of_birth: e.date_of_birth,
            marital_status: e.marital_status,
            religion: e.religion,
            nationality: e.nationality.clone(),
            phone_number: e.phone_number.clone(),
            address: e.address.clone(),
            job_id: e.job_id,
            department_id: e.department_id,
            employee_type_id: e.employee_type_id,
            employment_date: e.employment_date,
        }
    }
}

pub struct EmployeeRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> EmployeeRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<EmployeeDetails>> {
        let rows = sqlx::query_as::<_, EmployeeRow>(&format!("{} ORDER BY e.id", SELECT_EMPLOYEE))
            .fetch_all(self.pool)
            .await
            .context("Failed to list employees")?;

        rows.into_iter().map(row_to_details).collect()
    }

    pub async fn find_by_number(&self, employee_number: &str) -> Result<Option<EmployeeDetails>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        Self::find_by_number_in(&mut *conn, employee_number).await
    }

    pub async fn find_by_number_in(
        conn: &mut SqliteConnection,
        employee_number: &str,
    ) -> Result<Option<EmployeeDetails>> {
        let row = sqlx::query_as::<_, EmployeeRow>(&format!(
            "{} WHERE e.employee_number = ?",
            SELECT_EMPLOYEE
        ))
        .bind(employee_number)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to get employee by number")?;

        row.map(row_to_details).transpose()
    }

    pub async fn find_by_user_id(&self, user_id: i64) -> Result<Option<EmployeeDetails>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        Self::find_by_user_id_in(&mut *conn, user_id).await
    }

    pub async fn find_by_user_id_in(
        conn: &mut SqliteConnection,
        user_id: i64,
    ) -> Result<Option<EmployeeDetails>> {
        let row = sqlx::query_as::<_, EmployeeRow>(&format!("{} WHERE e.user_id = ?", SELECT_EMPLOYEE))
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await
            .context("Failed to get employee by user")?;

        row.map(row_to_details).transpose()
    }

    pub async fn find_by_id_in(
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<Option<EmployeeDetails>> {
        let row = sqlx::query_as::<_, EmployeeRow>(&format!("{} WHERE e.id = ?", SELECT_EMPLOYEE))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .context("Failed to get employee")?;

        row.map(row_to_details).transpose()
    }

    /// Insert an employee row without an employee number and return its id
    pub async fn insert(
        conn: &mut SqliteConnection,
        user_id: i64,
        profile: &EmployeeProfile,
    ) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            INSERT INTO employees (
                user_id, first_name, middle_name, last_name, gender, date_of_birth,
                marital_status, religion, nationality, phone_number, address,
                job_id, department_id, employee_type_id, employment_date,
                is_leave, is_active, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 1, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(&profile.first_name)
        .bind(&profile.middle_name)
        .bind(&profile.last_name)
        .bind(profile.gender.as_str())
        .bind(profile.date_of_birth.to_string())
        .bind(profile.marital_status.as_str())
        .bind(profile.religion.as_str())
        .bind(&profile.nationality)
        .bind(&profile.phone_number)
        .bind(&profile.address)
        .bind(profile.job_id)
        .bind(profile.department_id)
        .bind(profile.employee_type_id)
        .bind(profile.employment_date.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await
        .context("Failed to create employee")?;

        Ok(result.last_insert_rowid())
    }

    /// Write the employee number once. Returns false if one was already set.
    pub async fn assign_employee_number(
        conn: &mut SqliteConnection,
        id: i64,
        employee_number: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE employees SET employee_number = ? WHERE id = ? AND employee_number IS NULL",
        )
        .bind(employee_number)
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("Failed to assign employee number")?;

        Ok(result.rows_affected() > 0)
    }

    /// Overwrite the writable fields. The employee number is not touched.
    pub async fn update_profile(&self, id: i64, profile: &EmployeeProfile) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE employees
            SET first_name = ?, middle_name = ?, last_name = ?, gender = ?,
                date_of_birth = ?, marital_status = ?, religion = ?, nationality = ?,
                phone_number = ?, address = ?, job_id = ?, department_id = ?,
                employee_type_id = ?, employment_date = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&profile.first_name)
        .bind(&profile.middle_name)
        .bind(&profile.last_name)
        .bind(profile.gender.as_str())
        .bind(profile.date_of_birth.to_string())
        .bind(profile.marital_status.as_str())
        .bind(profile.religion.as_str())
        .bind(&profile.nationality)
        .bind(&profile.phone_number)
        .bind(&profile.address)
        .bind(profile.job_id)
        .bind(profile.department_id)
        .bind(profile.employee_type_id)
        .bind(profile.employment_date.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(self.pool)
        .await
        .context("Failed to update employee")?;

        Ok(result.rows_affected() > 0)
    }

    /// Set or clear the leave flag on an active employee.
    /// Returns false when the employee is inactive or already in that state.
    pub async fn set_leave(&self, id: i64, on_leave: bool) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE employees
            SET is_leave = ?, updated_at = ?
            WHERE id = ? AND is_active = 1 AND is_leave = ?
            "#,
        )
        .bind(on_leave)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .bind(!on_leave)
        .execute(self.pool)
        .await
        .context("Failed to update leave status")?;

        Ok(result.rows_affected() > 0)
    }

    /// Soft delete. Returns false if the employee was already inactive.
    pub async fn deactivate(
        conn: &mut SqliteConnection,
        id: i64,
        resignation_date: NaiveDate,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE employees
            SET is_active = 0, resignation_date = ?, updated_at = ?
            WHERE id = ? AND is_active = 1
            "#,
        )
        .bind(resignation_date.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("Failed to deactivate employee")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_details(row: EmployeeRow) -> Result<EmployeeDetails> {
    let employee = Employee {
        id: row.id,
        user_id: row.user_id,
        first_name: row.first_name,
        middle_name: row.middle_name,
        last_name: row.last_name,
        gender: row.gender.parse().map_err(anyhow::Error::msg)?,
        date_of_birth: parse_db_date(&row.date_of_birth)?,
        marital_status: row.marital_status.parse().map_err(anyhow::Error::msg)?,
        religion: row.religion.parse().map_err(anyhow::Error::msg)?,
        nationality: row.nationality,
        phone_number: row.phone_number,
        address: row.address,
        employee_number: row.employee_number,
        job_id: row.job_id,
        department_id: row.department_id,
        employee_type_id: row.employee_type_id,
        employment_date: parse_db_date(&row.employment_date)?,
        resignation_date: row.resignation_date.as_deref().map(parse_db_date).transpose()?,
        is_leave: row.is_leave,
        is_active: row.is_active,
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    };

    let mut user_groups: Vec<String> = row
        .user_groups
        .map(|g| g.split(',').map(str::to_string).collect())
        .unwrap_or_default();
    user_groups.sort();

    Ok(EmployeeDetails {
        employee,
        user_email: row.user_email,
        user_is_active: row.user_is_active,
        user_groups,
        job_title: row.job_title,
        department_code: row.department_code,
        employee_type_code: row.employee_type_code,
    })
}
