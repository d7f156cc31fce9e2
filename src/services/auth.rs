//! Authentication service
//!
//! Provides password hashing with Argon2 and credential checks.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::{
    db::{user_repository::NewUser, UserRepository},
    models::User,
    utils::{
        validation::{normalize_email, validate_new_password},
        AppError, AppResult,
    },
};

/// Prefix of password hashes that can never match any password
const UNUSABLE_PASSWORD_PREFIX: char = '!';

/// Authentication service for user credentials
pub struct AuthService {
    pool: SqlitePool,
}

impl AuthService {
    /// Create a new auth service
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Hash a password using Argon2id
    pub fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();
        Ok(password_hash)
    }

    /// Verify a password against a hash. Unusable hashes never verify.
    pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
        if !Self::has_usable_password(password_hash) {
            return Ok(false);
        }
        let parsed_hash = PasswordHash::new(password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// A random marker stored for invited users until they set a password.
    ///
    /// It differs per user so activation tokens of two invited users never
    /// share their password component.
    pub fn unusable_password() -> String {
        let suffix: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(40)
            .map(char::from)
            .collect();
        format!("{}{}", UNUSABLE_PASSWORD_PREFIX, suffix)
    }

    pub fn has_usable_password(password_hash: &str) -> bool {
        !password_hash.starts_with(UNUSABLE_PASSWORD_PREFIX)
    }

    /// Authenticate a user by email and password.
    ///
    /// Inactive users never authenticate, whatever the password.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let repo = UserRepository::new(&self.pool);
        let Some(user) = repo.find_by_email(&normalize_email(email)).await? else {
            return Ok(None);
        };

        if !user.is_active {
            return Ok(None);
        }

        if !Self::verify_password(password, &user.password_hash)? {
            return Ok(None);
        }

        repo.touch_last_login(user.id).await?;
        Ok(Some(user))
    }

    /// Create an active staff superuser unless one with that email exists.
    /// Returns `None` when the email is taken.
    pub async fn create_superuser(&self, email: &str, password: &str) -> Result<Option<User>> {
        let email = normalize_email(email);
        let repo = UserRepository::new(&self.pool);
        if repo.find_by_email(&email).await?.is_some() {
            return Ok(None);
        }

        let password_hash = Self::hash_password(password)?;
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let id = UserRepository::insert(
            &mut *conn,
            &NewUser {
                email: &email,
                password_hash: &password_hash,
                is_active: true,
                is_staff: true,
                is_superuser: true,
            },
        )
        .await?;
        drop(conn);

        info!(user_id = id, email = %email, "Superuser created");
        repo.find_by_id(id)
            .await?
            .context("Failed to retrieve created superuser")
            .map(Some)
    }

    /// Change the password of an authenticated user after checking the current one
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
        re_new_password: &str,
        min_length: usize,
    ) -> AppResult<()> {
        let repo = UserRepository::new(&self.pool);
        let user = repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !Self::verify_password(current_password, &user.password_hash)? {
            warn!(user_id, "Password change rejected: wrong current password");
            return Err(AppError::Validation("Invalid password.".to_string()));
        }

        validate_new_password(new_password, re_new_password, min_length)?;
        let password_hash = Self::hash_password(new_password)?;
        repo.set_password(user_id, &password_hash).await?;

        info!(user_id, "Password changed");
        Ok(())
    }
}
