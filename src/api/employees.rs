//! Employee endpoints
//!
//! Creation with invitation, record maintenance, leave transitions and
//! deactivation. Employees are addressed by their employee number.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use validator::Validate;

use crate::{
    middleware::require,
    models::{
        CreateEmployeeRequest, CreatedEmployeeResponse, DeactivateEmployeeRequest, EmailRequest,
        EmployeeResponse, Operation, Principal, UpdateEmployeeRequest,
    },
    services::{InvitationService, LifecycleService, SessionManager},
    utils::{AppJson, AppResult},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route("/invite", post(invite))
        .route("/employee", get(own_record))
        .route(
            "/{employee_number}",
            get(get_employee)
                .patch(update_employee)
                .delete(deactivate_employee),
        )
        .route("/{employee_number}/employee", get(employee_record))
        .route(
            "/{employee_number}/leave",
            post(start_leave).delete(end_leave),
        )
}

/// GET /api/v1/employees
async fn list_employees(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<Json<Vec<EmployeeResponse>>> {
    require(&principal, Operation::ListEmployees)?;

    let employees = LifecycleService::from_state(&state).list().await?;
    Ok(Json(
        employees.into_iter().map(|e| e.into_response()).collect(),
    ))
}

/// POST /api/v1/employees
async fn create_employee(
    State(state): State<AppState>,
    principal: Principal,
    AppJson(payload): AppJson<CreateEmployeeRequest>,
) -> AppResult<(StatusCode, Json<CreatedEmployeeResponse>)> {
    require(&principal, Operation::CreateEmployee)?;

    let created = InvitationService::from_state(&state)
        .create_employee(&principal, payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedEmployeeResponse {
            employee: created.details.into_response(),
            invitation_sent: created.invitation_sent,
        }),
    ))
}

/// POST /api/v1/employees/invite
async fn invite(
    State(state): State<AppState>,
    principal: Principal,
    AppJson(payload): AppJson<EmailRequest>,
) -> AppResult<StatusCode> {
    require(&principal, Operation::InviteEmployee)?;
    payload.validate()?;

    InvitationService::from_state(&state)
        .send_invitation(&payload.email)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/employees/employee
async fn own_record(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<Json<EmployeeResponse>> {
    require(&principal, Operation::ViewOwnEmployee)?;

    let details = LifecycleService::from_state(&state)
        .own_record(&principal)
        .await?;
    Ok(Json(details.into_response()))
}

/// GET /api/v1/employees/{employee_number}
async fn get_employee(
    State(state): State<AppState>,
    principal: Principal,
    Path(employee_number): Path<String>,
) -> AppResult<Json<EmployeeResponse>> {
    require(&principal, Operation::RetrieveEmployee)?;

    let details = LifecycleService::from_state(&state)
        .get(&employee_number)
        .await?;
    Ok(Json(details.into_response()))
}

/// GET /api/v1/employees/{employee_number}/employee
async fn employee_record(
    State(state): State<AppState>,
    principal: Principal,
    Path(employee_number): Path<String>,
) -> AppResult<Json<EmployeeResponse>> {
    require(&principal, Operation::ViewOwnEmployee)?;

    let details = LifecycleService::from_state(&state)
        .record_for(&principal, &employee_number)
        .await?;
    Ok(Json(details.into_response()))
}

/// PATCH /api/v1/employees/{employee_number}
async fn update_employee(
    State(state): State<AppState>,
    principal: Principal,
    Path(employee_number): Path<String>,
    AppJson(changes): AppJson<UpdateEmployeeRequest>,
) -> AppResult<Json<EmployeeResponse>> {
    require(&principal, Operation::UpdateEmployee)?;

    let details = LifecycleService::from_state(&state)
        .update(&principal, &employee_number, changes)
        .await?;
    Ok(Json(details.into_response()))
}

/// POST /api/v1/employees/{employee_number}/leave
async fn start_leave(
    State(state): State<AppState>,
    principal: Principal,
    Path(employee_number): Path<String>,
) -> AppResult<Json<EmployeeResponse>> {
    require(&principal, Operation::ChangeLeave)?;

    let details = LifecycleService::from_state(&state)
        .set_leave(&principal, &employee_number, true)
        .await?;
    Ok(Json(details.into_response()))
}

/// DELETE /api/v1/employees/{employee_number}/leave
async fn end_leave(
    State(state): State<AppState>,
    principal: Principal,
    Path(employee_number): Path<String>,
) -> AppResult<Json<EmployeeResponse>> {
    require(&principal, Operation::ChangeLeave)?;

    let details = LifecycleService::from_state(&state)
        .set_leave(&principal, &employee_number, false)
        .await?;
    Ok(Json(details.into_response()))
}

/// Deactivate an employee and its user. The body is optional; without a
/// `resignation_date` today is used. Self-deactivation ends the session.
///
/// DELETE /api/v1/employees/{employee_number}
async fn deactivate_employee(
    State(state): State<AppState>,
    principal: Principal,
    jar: CookieJar,
    Path(employee_number): Path<String>,
    payload: Option<AppJson<DeactivateEmployeeRequest>>,
) -> AppResult<(StatusCode, CookieJar)> {
    require(&principal, Operation::DeactivateEmployee)?;
    let payload = payload.map(|AppJson(p)| p).unwrap_or_default();

    let outcome = LifecycleService::from_state(&state)
        .deactivate(&principal, &employee_number, payload.resignation_date)
        .await?;

    let jar = if outcome.self_deactivated {
        SessionManager::new(&state.config).cleared(jar)
    } else {
        jar
    };
    Ok((StatusCode::NO_CONTENT, jar))
}
