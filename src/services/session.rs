//! Session cookie manager
//!
//! Issues the access/refresh token pair, writes them into HTTP-only cookies,
//! refreshes the access token from the refresh cookie and clears both on
//! logout.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::{
    config::{AppConfig, SameSitePolicy},
    db::UserRepository,
    middleware::auth::{
        create_access_token, create_refresh_token, validate_token, AuthError, Claims, TokenType,
    },
    services::AuthService,
    utils::{AppError, AppResult},
};

/// Freshly minted token pair
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access: String,
    pub refresh: String,
}

pub struct SessionManager<'a> {
    config: &'a AppConfig,
}

impl<'a> SessionManager<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    /// Check credentials and mint a token pair
    pub async fn login(&self, pool: &SqlitePool, email: &str, password: &str) -> AppResult<SessionTokens> {
        let auth = AuthService::new(pool.clone());
        let Some(user) = auth.authenticate(email, password).await? else {
            warn!(email = %email, "Failed login attempt");
            return Err(AppError::Authentication(
                "No active account found with the given credentials".to_string(),
            ));
        };

        let tokens = self.issue(user.id)?;
        info!(user_id = user.id, "User logged in");
        Ok(tokens)
    }

    pub fn issue(&self, user_id: i64) -> AppResult<SessionTokens> {
        let auth = &self.config.auth;
        let access = create_access_token(user_id, &auth.jwt_secret, auth.access_token_ttl_secs)
            .map_err(|e| AppError::Internal(format!("Failed to create access token: {}", e)))?;
        let refresh = create_refresh_token(user_id, &auth.jwt_secret, auth.refresh_token_ttl_secs)
            .map_err(|e| AppError::Internal(format!("Failed to create refresh token: {}", e)))?;
        Ok(SessionTokens { access, refresh })
    }

    /// Mint a new access token from the refresh cookie. The refresh token is
    /// not rotated. Only the cookie is consulted.
    pub async fn refresh(&self, pool: &SqlitePool, jar: &CookieJar) -> AppResult<String> {
        let token = jar
            .get(&self.config.cookies.refresh_name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = validate_token(&token, &self.config.auth.jwt_secret)?.claims;
        if claims.token_type != TokenType::Refresh {
            return Err(AuthError::InvalidTokenType.into());
        }
        let user_id = claims.user_id()?;

        // A deactivated account keeps no session, even with a live refresh token
        let active = UserRepository::new(pool)
            .find_by_id(user_id)
            .await?
            .is_some_and(|u| u.is_active);
        if !active {
            return Err(AuthError::InactiveUser.into());
        }

        let auth = &self.config.auth;
        create_access_token(user_id, &auth.jwt_secret, auth.access_token_ttl_secs)
            .map_err(|e| AppError::Internal(format!("Failed to create access token: {}", e)))
    }

    /// Signature and expiry check only. The explicit token wins over the
    /// access cookie.
    pub fn verify(&self, token: Option<&str>, jar: &CookieJar) -> AppResult<Claims> {
        let token = token
            .map(str::to_string)
            .filter(|t| !t.is_empty())
            .or_else(|| {
                jar.get(&self.config.cookies.access_name)
                    .map(|c| c.value().to_string())
            })
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        Ok(validate_token(&token, &self.config.auth.jwt_secret)?.claims)
    }

    pub fn with_session(&self, jar: CookieJar, tokens: &SessionTokens) -> CookieJar {
        jar.add(self.access_cookie(tokens.access.clone()))
            .add(self.refresh_cookie(tokens.refresh.clone()))
    }

    pub fn with_access(&self, jar: CookieJar, access: String) -> CookieJar {
        jar.add(self.access_cookie(access))
    }

    /// Expire both cookies, whether or not the request carried them
    pub fn cleared(&self, jar: CookieJar) -> CookieJar {
        let names = [
            self.config.cookies.access_name.clone(),
            self.config.cookies.refresh_name.clone(),
        ];
        names.into_iter().fold(jar, |jar, name| {
            let mut cookie = self.base_cookie(name, String::new());
            cookie.make_removal();
            jar.add(cookie)
        })
    }

    pub fn access_cookie(&self, value: String) -> Cookie<'static> {
        let mut cookie = self.base_cookie(self.config.cookies.access_name.clone(), value);
        cookie.set_max_age(max_age(self.config.auth.access_token_ttl_secs));
        cookie
    }

    pub fn refresh_cookie(&self, value: String) -> Cookie<'static> {
        let mut cookie = self.base_cookie(self.config.cookies.refresh_name.clone(), value);
        cookie.set_max_age(max_age(self.config.auth.refresh_token_ttl_secs));
        cookie
    }

    fn base_cookie(&self, name: String, value: String) -> Cookie<'static> {
        let cookies = &self.config.cookies;
        Cookie::build((name, value))
            .path(cookies.path.clone())
            .http_only(cookies.http_only)
            .secure(cookies.secure)
            .same_site(match cookies.same_site {
                SameSitePolicy::Strict => SameSite::Strict,
                SameSitePolicy::Lax => SameSite::Lax,
                SameSitePolicy::None => SameSite::None,
            })
            .build()
    }
}

fn max_age(secs: u64) -> time::Duration {
    time::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
}
