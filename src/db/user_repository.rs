//! User, group membership and permission repository

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use super::parse_db_timestamp;
use crate::models::User;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password_hash: String,
    is_active: bool,
    is_staff: bool,
    is_superuser: bool,
    last_login: Option<String>,
    date_joined: String,
}

const USER_COLUMNS: &str =
    "id, email, password_hash, is_active, is_staff, is_superuser, last_login, date_joined";

/// Fields of a user about to be inserted
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        Self::find_by_id_in(&mut *conn, id).await
    }

    /// Same as [`find_by_id`](Self::find_by_id) on an open connection or transaction
    pub async fn find_by_id_in(conn: &mut SqliteConnection, id: i64) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to get user")?;

        Ok(row.map(row_to_user))
    }

    /// Case-insensitive lookup by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email.trim())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get user by email")?;

        Ok(row.map(row_to_user))
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY id",
            USER_COLUMNS
        ))
        .fetch_all(self.pool)
        .await
        .context("Failed to list users")?;

        Ok(rows.into_iter().map(row_to_user).collect())
    }

    /// Names of the groups the user belongs to
    pub async fn groups_for(&self, user_id: i64) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT g.name
            FROM auth_groups g
            INNER JOIN user_groups ug ON ug.group_id = g.id
            WHERE ug.user_id = ?
            ORDER BY g.name
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .context("Failed to get user groups")?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Permission codenames granted through the user's groups
    pub async fn group_permissions_for(&self, user_id: i64) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT gp.codename
            FROM group_permissions gp
            INNER JOIN user_groups ug ON ug.group_id = gp.group_id
            WHERE ug.user_id = ?
            ORDER BY gp.codename
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .context("Failed to get user permissions")?;

        Ok(rows.into_iter().map(|(codename,)| codename).collect())
    }

    /// Every permission codename known to the system
    pub async fn all_permissions(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT codename FROM group_permissions ORDER BY codename")
                .fetch_all(self.pool)
                .await
                .context("Failed to list permissions")?;

        Ok(rows.into_iter().map(|(codename,)| codename).collect())
    }

    pub async fn set_password(&self, id: i64, password_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(self.pool)
            .await
            .context("Failed to update password")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn touch_last_login(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(self.pool)
            .await
            .context("Failed to update last login")?;
        Ok(())
    }

    /// Insert a user and return its id
    pub async fn insert(conn: &mut SqliteConnection, user: &NewUser<'_>) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (email, password_hash, is_active, is_staff, is_superuser, date_joined)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *conn)
        .await
        .context("Failed to create user")?;

        Ok(result.last_insert_rowid())
    }

    /// Add the user to a named group. Fails when the group does not exist.
    pub async fn add_to_group(
        conn: &mut SqliteConnection,
        user_id: i64,
        group_name: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO user_groups (user_id, group_id)
            SELECT ?, id FROM auth_groups WHERE name = ?
            "#,
        )
        .bind(user_id)
        .bind(group_name)
        .execute(&mut *conn)
        .await
        .context("Failed to add user to group")?;

        if result.rows_affected() == 0 {
            let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM auth_groups WHERE name = ?")
                .bind(group_name)
                .fetch_optional(&mut *conn)
                .await
                .context("Failed to look up group")?;
            if exists.is_none() {
                anyhow::bail!("Authorization group '{}' does not exist", group_name);
            }
        }
        Ok(())
    }

    /// Flip `is_active` from false to true. Returns false if the user was
    /// already active, so concurrent activations succeed at most once.
    pub async fn activate(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET is_active = 1 WHERE id = ? AND is_active = 0")
            .bind(id)
            .execute(&mut *conn)
            .await
            .context("Failed to activate user")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn deactivate(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await
            .context("Failed to deactivate user")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_user(row: UserRow) -> User {
    User {
        id: row.id,
        email: row.email,
        password_hash: row.password_hash,
        is_active: row.is_active,
        is_staff: row.is_staff,
        is_superuser: row.is_superuser,
        last_login: row.last_login.as_deref().map(parse_db_timestamp),
        date_joined: parse_db_timestamp(&row.date_joined),
    }
}
