//! Test fixtures for common test data
//!
//! Seeds the catalog and creates users of each role directly through the
//! repositories and services, bypassing HTTP.

use std::collections::BTreeSet;

use hr_onboarding::{
    db::{
        employee_repository::EmployeeDetails, user_repository::NewUser, CatalogRepository,
        UserRepository,
    },
    models::{NewCodedRecord, NewJob, Principal, HR_GROUP},
    services::{AuthService, InvitationService},
    AppState,
};

use super::factories::EmployeePayload;
use super::test_app::TestApp;

pub const PASSWORD: &str = "Sup3r-secret-pw";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const HR_EMAIL: &str = "hr@example.com";

pub const JOB_TITLE: &str = "Engineer";
pub const DEPARTMENT_CODE: &str = "ENG";
pub const EMPLOYEE_TYPE_CODE: &str = "FT";

/// Jobs, departments and employee types every test can reference
pub async fn seed_catalog(state: &AppState) {
    let catalog = CatalogRepository::new(&state.db);
    catalog
        .create_job(&NewJob {
            title: JOB_TITLE.to_string(),
            description: "Builds and runs the product".to_string(),
        })
        .await
        .unwrap();
    catalog
        .create_job(&NewJob {
            title: "Recruiter".to_string(),
            description: String::new(),
        })
        .await
        .unwrap();
    catalog
        .create_department(&NewCodedRecord {
            name: "Engineering".to_string(),
            code: DEPARTMENT_CODE.to_string(),
            description: String::new(),
        })
        .await
        .unwrap();
    catalog
        .create_department(&NewCodedRecord {
            name: "Human Resources".to_string(),
            code: "HR".to_string(),
            description: String::new(),
        })
        .await
        .unwrap();
    catalog
        .create_employee_type(&NewCodedRecord {
            name: "Full Time".to_string(),
            code: EMPLOYEE_TYPE_CODE.to_string(),
            description: String::new(),
        })
        .await
        .unwrap();
}

/// Active staff superuser
pub async fn create_admin(state: &AppState) -> i64 {
    AuthService::new(state.db.clone())
        .create_superuser(ADMIN_EMAIL, PASSWORD)
        .await
        .unwrap()
        .expect("admin email is free")
        .id
}

/// Active user with a usable password, optionally in one group
pub async fn create_user(state: &AppState, email: &str, group: Option<&str>) -> i64 {
    let password_hash = AuthService::hash_password(PASSWORD).unwrap();
    let mut conn = state.db.acquire().await.unwrap();
    let id = UserRepository::insert(
        &mut *conn,
        &NewUser {
            email,
            password_hash: &password_hash,
            is_active: true,
            is_staff: false,
            is_superuser: false,
        },
    )
    .await
    .unwrap();
    if let Some(group) = group {
        UserRepository::add_to_group(&mut *conn, id, group).await.unwrap();
    }
    id
}

pub async fn create_hr_user(state: &AppState) -> i64 {
    create_user(state, HR_EMAIL, Some(HR_GROUP)).await
}

/// Principal acting as a system administrator, for service-level setup
pub fn system_principal() -> Principal {
    Principal {
        user_id: 0,
        email: "system@example.com".to_string(),
        is_staff: true,
        is_superuser: true,
        groups: BTreeSet::new(),
    }
}

/// Employee created without an invitation, still pending
pub async fn create_pending_employee(state: &AppState, email: &str) -> EmployeeDetails {
    let payload = EmployeePayload::new(email).send_invite(false).into_request();
    InvitationService::from_state(state)
        .create_employee(&system_principal(), payload)
        .await
        .unwrap()
        .details
}

/// Employee whose account is active with [`PASSWORD`]
pub async fn create_active_employee(state: &AppState, email: &str) -> EmployeeDetails {
    let details = create_pending_employee(state, email).await;
    let user_id = details.employee.user_id;

    let password_hash = AuthService::hash_password(PASSWORD).unwrap();
    UserRepository::new(&state.db)
        .set_password(user_id, &password_hash)
        .await
        .unwrap();
    let mut conn = state.db.acquire().await.unwrap();
    assert!(UserRepository::activate(&mut *conn, user_id).await.unwrap());
    drop(conn);

    reload(state, &details).await
}

pub async fn reload(state: &AppState, details: &EmployeeDetails) -> EmployeeDetails {
    hr_onboarding::db::EmployeeRepository::new(&state.db)
        .find_by_user_id(details.employee.user_id)
        .await
        .unwrap()
        .expect("employee exists")
}

/// App with the catalog seeded, an admin and an HR user
pub async fn seeded_app() -> TestApp {
    let app = TestApp::new().await;
    seed_catalog(&app.state).await;
    create_admin(&app.state).await;
    create_hr_user(&app.state).await;
    app
}
