//! JWT Authentication Middleware
//!
//! Session tokens travel in HTTP-only cookies. The middleware also accepts an
//! `Authorization: JWT <token>` (or `Bearer <token>`) header for API clients.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{
    db::UserRepository,
    models::Principal,
    utils::{AppError, AppResult},
    AppState,
};

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Not before timestamp
    pub nbf: i64,
    /// JWT ID (unique identifier for this token)
    pub jti: String,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

impl Claims {
    pub fn new(user_id: i64, token_type: TokenType, issued_at: DateTime<Utc>, ttl_secs: u64) -> Self {
        let exp = issued_at + Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX / 1000));
        Self {
            sub: user_id.to_string(),
            iat: issued_at.timestamp(),
            exp: exp.timestamp(),
            nbf: issued_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type,
        }
    }

    /// The user id carried in `sub`
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// Token type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    #[default]
    Access,
    Refresh,
}

/// Sign a set of claims
pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Create a new JWT access token
pub fn create_access_token(
    user_id: i64,
    secret: &str,
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode_token(
        &Claims::new(user_id, TokenType::Access, Utc::now(), ttl_secs),
        secret,
    )
}

/// Create a new JWT refresh token
pub fn create_refresh_token(
    user_id: i64,
    secret: &str,
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode_token(
        &Claims::new(user_id, TokenType::Refresh, Utc::now(), ttl_secs),
        secret,
    )
}

/// Validate and decode a JWT token (signature, expiry and not-before)
pub fn validate_token(token: &str, secret: &str) -> Result<TokenData<Claims>, AuthError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.validate_nbf = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })
}

/// Authentication error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    TokenExpired,
    InvalidTokenType,
    InactiveUser,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        // Expired and tampered tokens look the same to the client
        let message = match err {
            AuthError::MissingToken => "Authentication credentials were not provided.",
            AuthError::InvalidToken | AuthError::TokenExpired | AuthError::InvalidTokenType => {
                "Token is invalid or expired"
            }
            AuthError::InactiveUser => "User is inactive",
        };
        AppError::Authentication(message.to_string())
    }
}

/// Extract the token from an `Authorization` header value
fn extract_header_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("JWT ")
        .or_else(|| auth_header.strip_prefix("Bearer "))
        .or_else(|| auth_header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Access token from the header, falling back to the access cookie
fn request_token(parts_headers: &axum::http::HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(token) = parts_headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_header_token)
    {
        return Some(token.to_string());
    }
    CookieJar::from_headers(parts_headers)
        .get(cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the principal for a valid access token
pub async fn principal_for_token(state: &AppState, token: &str) -> Result<Principal, AuthError> {
    let token_data = validate_token(token, &state.config.auth.jwt_secret)?;
    if token_data.claims.token_type != TokenType::Access {
        return Err(AuthError::InvalidTokenType);
    }
    let user_id = token_data.claims.user_id()?;

    let repo = UserRepository::new(&state.db);
    let user = repo
        .find_by_id(user_id)
        .await
        .map_err(|_| AuthError::InvalidToken)?
        .ok_or(AuthError::InvalidToken)?;
    if !user.is_active {
        return Err(AuthError::InactiveUser);
    }
    let groups = repo
        .groups_for(user.id)
        .await
        .map_err(|_| AuthError::InvalidToken)?;

    Ok(Principal::new(&user, groups))
}

/// Authentication middleware
///
/// Validates the access token and injects the [`Principal`] into request
/// extensions. Deactivated users are rejected even with an unexpired token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let token = request_token(request.headers(), &state.config.cookies.access_name)
        .ok_or(AuthError::MissingToken)?;

    let principal = principal_for_token(&state, &token).await.map_err(|e| {
        debug!(error = ?e, "Rejected access token");
        e
    })?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Extractor for the authenticated principal
///
/// This allows using Principal as a handler parameter after auth middleware has run.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| AuthError::MissingToken.into())
    }
}
