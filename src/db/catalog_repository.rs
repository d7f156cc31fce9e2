//! Jobs, departments and employee types

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

use super::parse_db_timestamp;
use crate::models::{
    CatalogFixtures, Department, EmployeeType, Job, NewCodedRecord, NewJob, DEPARTMENT_CODE_MAX,
    EMPLOYEE_TYPE_CODE_MAX,
};
use crate::utils::{validation::validate_short_code, AppResult};

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: i64,
    title: String,
    description: String,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, sqlx::FromRow)]
struct DepartmentRow {
    id: i64,
    name: String,
    code: String,
    description: String,
    head_id: Option<i64>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, sqlx::FromRow)]
struct EmployeeTypeRow {
    id: i64,
    name: String,
    code: String,
    description: String,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

pub struct CatalogRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CatalogRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    // Jobs

    pub async fn create_job(&self, job: &NewJob) -> AppResult<Job> {
        let title = job.title.trim();
        if title.is_empty() || title.chars().count() > 50 {
            return Err(crate::utils::AppError::Validation(
                "title must be between 1 and 50 characters".to_string(),
            ));
        }
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            INSERT INTO jobs (title, description, is_active, created_at, updated_at)
            VALUES (?, ?, 1, ?, ?)
            "#,
        )
        .bind(title)
        .bind(&job.description)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        Ok(self
            .get_job(result.last_insert_rowid())
            .await?
            .context("Failed to retrieve created job")?)
    }

    pub async fn get_job(&self, id: i64) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT id, title, description, is_active, created_at, updated_at FROM jobs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .context("Failed to get job")?;

        Ok(row.map(row_to_job))
    }

    pub async fn find_job_by_title(&self, title: &str) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT id, title, description, is_active, created_at, updated_at FROM jobs WHERE title = ?",
        )
        .bind(title.trim())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get job by title")?;

        Ok(row.map(row_to_job))
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT id, title, description, is_active, created_at, updated_at FROM jobs ORDER BY title",
        )
        .fetch_all(self.pool)
        .await
        .context("Failed to list jobs")?;

        Ok(rows.into_iter().map(row_to_job).collect())
    }

    /// Soft delete
    pub async fn deactivate_job(&self, id: i64) -> Result<bool> {
        self.deactivate("jobs", id).await
    }

    // Departments

    pub async fn create_department(&self, department: &NewCodedRecord) -> AppResult<Department> {
        validate_short_code("code", &department.code, DEPARTMENT_CODE_MAX)?;
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            INSERT INTO departments (name, code, description, is_active, created_at, updated_at)
            VALUES (?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(department.name.trim())
        .bind(&department.code)
        .bind(&department.description)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        Ok(self
            .get_department(result.last_insert_rowid())
            .await?
            .context("Failed to retrieve created department")?)
    }

    pub async fn get_department(&self, id: i64) -> Result<Option<Department>> {
        let row = sqlx::query_as::<_, DepartmentRow>(
            r#"
            SELECT id, name, code, description, head_id, is_active, created_at, updated_at
            FROM departments
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .context("Failed to get department")?;

        Ok(row.map(row_to_department))
    }

    pub async fn find_department_by_code(&self, code: &str) -> Result<Option<Department>> {
        let row = sqlx::query_as::<_, DepartmentRow>(
            r#"
            SELECT id, name, code, description, head_id, is_active, created_at, updated_at
            FROM departments
            WHERE code = ?
            "#,
        )
        .bind(code.trim())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get department by code")?;

        Ok(row.map(row_to_department))
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>> {
        let rows = sqlx::query_as::<_, DepartmentRow>(
            r#"
            SELECT id, name, code, description, head_id, is_active, created_at, updated_at
            FROM departments
            ORDER BY code
            "#,
        )
        .fetch_all(self.pool)
        .await
        .context("Failed to list departments")?;

        Ok(rows.into_iter().map(row_to_department).collect())
    }

    /// Make an employee the head of a department. An employee heads at most
    /// one department.
    pub async fn set_department_head(&self, department_id: i64, employee_id: i64) -> AppResult<bool> {
        let result = sqlx::query("UPDATE departments SET head_id = ?, updated_at = ? WHERE id = ?")
            .bind(employee_id)
            .bind(Utc::now().to_rfc3339())
            .bind(department_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn deactivate_department(&self, id: i64) -> Result<bool> {
        self.deactivate("departments", id).await
    }

    // Employee types

    pub async fn create_employee_type(&self, record: &NewCodedRecord) -> AppResult<EmployeeType> {
        validate_short_code("code", &record.code, EMPLOYEE_TYPE_CODE_MAX)?;
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            INSERT INTO employee_types (name, code, description, is_active, created_at, updated_at)
            VALUES (?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(record.name.trim())
        .bind(&record.code)
        .bind(&record.description)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        Ok(self
            .get_employee_type(result.last_insert_rowid())
            .await?
            .context("Failed to retrieve created employee type")?)
    }

    pub async fn get_employee_type(&self, id: i64) -> Result<Option<EmployeeType>> {
        let row = sqlx::query_as::<_, EmployeeTypeRow>(
            r#"
            SELECT id, name, code, description, is_active, created_at, updated_at
            FROM employee_types
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .context("Failed to get employee type")?;

        Ok(row.map(row_to_employee_type))
    }

    pub async fn find_employee_type_by_code(&self, code: &str) -> Result<Option<EmployeeType>> {
        let row = sqlx::query_as::<_, EmployeeTypeRow>(
            r#"
            SELECT id, name, code, description, is_active, created_at, updated_at
            FROM employee_types
            WHERE code = ?
            "#,
        )
        .bind(code.trim())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get employee type by code")?;

        Ok(row.map(row_to_employee_type))
    }

    pub async fn list_employee_types(&self) -> Result<Vec<EmployeeType>> {
        let rows = sqlx::query_as::<_, EmployeeTypeRow>(
            r#"
            SELECT id, name, code, description, is_active, created_at, updated_at
            FROM employee_types
            ORDER BY code
            "#,
        )
        .fetch_all(self.pool)
        .await
        .context("Failed to list employee types")?;

        Ok(rows.into_iter().map(row_to_employee_type).collect())
    }

    pub async fn deactivate_employee_type(&self, id: i64) -> Result<bool> {
        self.deactivate("employee_types", id).await
    }

    /// Create the records of a fixture file, skipping titles and codes that
    /// already exist. Returns how many records were created.
    pub async fn load_fixtures(&self, fixtures: &CatalogFixtures) -> AppResult<usize> {
        let mut created = 0;

        for job in &fixtures.jobs {
            if self.find_job_by_title(job.title.trim()).await?.is_none() {
                self.create_job(job).await?;
                created += 1;
            }
        }
        for department in &fixtures.departments {
            if self.find_department_by_code(department.code.trim()).await?.is_none() {
                self.create_department(department).await?;
                created += 1;
            }
        }
        for employee_type in &fixtures.employee_types {
            if self
                .find_employee_type_by_code(employee_type.code.trim())
                .await?
                .is_none()
            {
                self.create_employee_type(employee_type).await?;
                created += 1;
            }
        }

        Ok(created)
    }

    async fn deactivate(&self, table: &'static str, id: i64) -> Result<bool> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET is_active = 0, updated_at = ? WHERE id = ?",
            table
        ))
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(self.pool)
        .await
        .with_context(|| format!("Failed to deactivate {} row", table))?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_job(row: JobRow) -> Job {
    Job {
        id: row.id,
        title: row.title,
        description: row.description,
        is_active: row.is_active,
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}

fn row_to_department(row: DepartmentRow) -> Department {
    Department {
        id: row.id,
        name: row.name,
        code: row.code,
        description: row.description,
        head_id: row.head_id,
        is_active: row.is_active,
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}

fn row_to_employee_type(row: EmployeeTypeRow) -> EmployeeType {
    EmployeeType {
        id: row.id,
        name: row.name,
        code: row.code,
        description: row.description,
        is_active: row.is_active,
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}
