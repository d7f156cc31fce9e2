//! User account endpoints
//!
//! Current-user lookup, admin user management, account activation and the
//! password reset/change flows.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use validator::Validate;

use crate::{
    db::UserRepository,
    middleware::require,
    models::{
        ActivationRequest, CurrentUserResponse, EmailRequest, Operation,
        PasswordResetConfirmRequest, Principal, SetPasswordRequest, UserPublic,
    },
    services::{
        authorization::{effective_permissions, effective_role},
        AuthService, InvitationService, LifecycleService, SessionManager,
    },
    utils::{AppError, AppJson, AppResult},
    AppState,
};

/// Account routes reachable without a session
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/activation", post(activate))
        .route("/reset_password", post(reset_password))
        .route("/reset_password_confirm", post(reset_password_confirm))
}

/// Account routes that need a session
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/me", get(current_user))
        .route("/{id}", delete(delete_user))
        .route("/resend_activation", post(resend_activation))
        .route("/set_password", post(set_password))
}

/// GET /api/v1/users/me
async fn current_user(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<Json<CurrentUserResponse>> {
    require(&principal, Operation::CurrentUser)?;

    let user = UserRepository::new(&state.db)
        .find_by_id(principal.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let permissions = effective_permissions(&state.db, &principal).await?;

    Ok(Json(CurrentUserResponse {
        id: user.id,
        email: user.email,
        is_active: user.is_active,
        is_staff: user.is_staff,
        is_superuser: user.is_superuser,
        groups: principal.groups.iter().cloned().collect(),
        role: effective_role(&principal),
        permissions,
    }))
}

/// GET /api/v1/users
async fn list_users(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<Json<Vec<UserPublic>>> {
    require(&principal, Operation::ListUsers)?;

    let repo = UserRepository::new(&state.db);
    let mut users = Vec::new();
    for user in repo.list().await? {
        let groups = repo.groups_for(user.id).await?;
        users.push(UserPublic::new(&user, groups));
    }
    Ok(Json(users))
}

/// Soft-deactivate a user. Deleting yourself also ends your session.
///
/// DELETE /api/v1/users/{id}
async fn delete_user(
    State(state): State<AppState>,
    principal: Principal,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> AppResult<(StatusCode, CookieJar)> {
    require(&principal, Operation::DeleteUser)?;

    let outcome = LifecycleService::from_state(&state)
        .deactivate_user(&principal, id)
        .await?;

    let jar = if outcome.self_deactivated {
        SessionManager::new(&state.config).cleared(jar)
    } else {
        jar
    };
    Ok((StatusCode::NO_CONTENT, jar))
}

/// POST /api/v1/users/activation
async fn activate(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ActivationRequest>,
) -> AppResult<StatusCode> {
    InvitationService::from_state(&state)
        .activate(&payload.uid, &payload.token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/users/resend_activation
async fn resend_activation(
    State(state): State<AppState>,
    principal: Principal,
    AppJson(payload): AppJson<EmailRequest>,
) -> AppResult<StatusCode> {
    require(&principal, Operation::ResendActivation)?;
    payload.validate()?;

    InvitationService::from_state(&state)
        .send_invitation(&payload.email)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Always 204 for a well-formed email, known or not
///
/// POST /api/v1/users/reset_password
async fn reset_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<EmailRequest>,
) -> AppResult<StatusCode> {
    payload.validate()?;

    InvitationService::from_state(&state)
        .send_password_reset(&payload.email)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/users/reset_password_confirm
async fn reset_password_confirm(
    State(state): State<AppState>,
    AppJson(payload): AppJson<PasswordResetConfirmRequest>,
) -> AppResult<StatusCode> {
    InvitationService::from_state(&state)
        .confirm_password_reset(&payload)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/users/set_password
async fn set_password(
    State(state): State<AppState>,
    principal: Principal,
    AppJson(payload): AppJson<SetPasswordRequest>,
) -> AppResult<StatusCode> {
    require(&principal, Operation::SetPassword)?;

    AuthService::new(state.db.clone())
        .change_password(
            principal.user_id,
            &payload.current_password,
            &payload.new_password,
            &payload.re_new_password,
            state.config.auth.password_min_length,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
