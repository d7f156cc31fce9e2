//! Session endpoints
//!
//! Login, refresh, verify and logout. Tokens travel in HTTP-only cookies;
//! the access token is also returned in the body.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{json, Value};

use crate::{
    models::{AccessResponse, LoginRequest, VerifyRequest},
    services::SessionManager,
    utils::{AppJson, AppResult},
    AppState,
};

/// Session routes (no auth required)
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/verify", post(verify))
        .route("/logout", post(logout))
}

/// Login handler
///
/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<(CookieJar, Json<AccessResponse>)> {
    let sessions = SessionManager::new(&state.config);
    let tokens = sessions
        .login(&state.db, &payload.email, &payload.password)
        .await?;

    let access = tokens.access.clone();
    Ok((sessions.with_session(jar, &tokens), Json(AccessResponse { access })))
}

/// Mint a new access token from the refresh cookie. A refresh value in the
/// body is ignored.
///
/// POST /api/v1/auth/refresh
async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<AccessResponse>)> {
    let sessions = SessionManager::new(&state.config);
    let access = sessions.refresh(&state.db, &jar).await?;

    let jar = sessions.with_access(jar, access.clone());
    Ok((jar, Json(AccessResponse { access })))
}

/// POST /api/v1/auth/verify
async fn verify(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Option<AppJson<VerifyRequest>>,
) -> AppResult<Json<Value>> {
    let payload = payload.map(|AppJson(p)| p).unwrap_or_default();
    SessionManager::new(&state.config).verify(payload.token.as_deref(), &jar)?;
    Ok(Json(json!({})))
}

/// Clears both cookies whatever the request carried
///
/// POST /api/v1/auth/logout
async fn logout(State(state): State<AppState>, jar: CookieJar) -> (StatusCode, CookieJar) {
    (
        StatusCode::NO_CONTENT,
        SessionManager::new(&state.config).cleared(jar),
    )
}
