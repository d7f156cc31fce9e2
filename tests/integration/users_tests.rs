//! User account endpoint tests

use serde_json::{json, Value};

use crate::common::{
    create_active_employee, create_pending_employee, create_user, reload, seeded_app, ADMIN_EMAIL,
    HR_EMAIL, PASSWORD,
};

#[tokio::test]
async fn test_me_reports_effective_role() {
    let app = seeded_app().await;
    create_active_employee(&app.state, "emp@example.com").await;
    create_user(&app.state, "plain@example.com", None).await;

    let admin = app.login(ADMIN_EMAIL, PASSWORD).await;
    let body: Value = app.get_as("/api/v1/users/me", &admin).await.json();
    assert_eq!(body["role"], "admin");
    assert_eq!(body["is_superuser"], true);
    let permissions = body["permissions"].as_array().unwrap();
    assert!(permissions.contains(&json!("add_employee")));
    assert!(permissions.contains(&json!("view_employee")));

    let hr = app.login(HR_EMAIL, PASSWORD).await;
    let body: Value = app.get_as("/api/v1/users/me", &hr).await.json();
    assert_eq!(body["role"], "hr");
    assert_eq!(body["groups"], json!(["HR"]));
    let permissions = body["permissions"].as_array().unwrap();
    assert!(permissions.contains(&json!("add_employee")));
    assert!(!permissions.contains(&json!("view_employee")));

    let employee = app.login("emp@example.com", PASSWORD).await;
    let body: Value = app.get_as("/api/v1/users/me", &employee).await.json();
    assert_eq!(body["role"], "employee");
    assert_eq!(body["permissions"], json!(["change_user", "view_employee"]));

    let plain = app.login("plain@example.com", PASSWORD).await;
    let body: Value = app.get_as("/api/v1/users/me", &plain).await.json();
    assert_eq!(body["role"], "anonymous");
    assert_eq!(body["permissions"], json!([]));
}

#[tokio::test]
async fn test_me_never_exposes_password_hash() {
    let app = seeded_app().await;
    let admin = app.login(ADMIN_EMAIL, PASSWORD).await;
    let response = app.get_as("/api/v1/users/me", &admin).await;
    response.assert_ok();
    assert!(!response.text().contains("password"));
}

#[tokio::test]
async fn test_user_list_is_admin_only() {
    let app = seeded_app().await;
    create_pending_employee(&app.state, "p@example.com").await;

    let admin = app.login(ADMIN_EMAIL, PASSWORD).await;
    let users: Vec<Value> = app.get_as("/api/v1/users", &admin).await.json();
    assert_eq!(users.len(), 3);
    let pending = users.iter().find(|u| u["email"] == "p@example.com").unwrap();
    assert_eq!(pending["is_active"], false);
    assert_eq!(pending["groups"], json!(["Employee"]));

    let hr = app.login(HR_EMAIL, PASSWORD).await;
    app.get_as("/api/v1/users", &hr).await.assert_forbidden();
}

#[tokio::test]
async fn test_admin_deletes_user_with_employee() {
    let app = seeded_app().await;
    let employee = create_active_employee(&app.state, "bye@example.com").await;
    let session = app.login("bye@example.com", PASSWORD).await;
    let admin = app.login(ADMIN_EMAIL, PASSWORD).await;

    let response = app
        .delete_as(
            &format!("/api/v1/users/{}", employee.employee.user_id),
            None,
            &admin,
        )
        .await;
    response.assert_no_content();
    assert!(!response.sets_cookies());

    let after = reload(&app.state, &employee).await;
    assert!(!after.user_is_active);
    assert!(!after.employee.is_active);
    assert!(after.employee.resignation_date.is_some());

    app.get_as("/api/v1/users/me", &session)
        .await
        .assert_unauthorized();
}

#[tokio::test]
async fn test_delete_user_rules() {
    let app = seeded_app().await;
    let hr = app.login(HR_EMAIL, PASSWORD).await;
    let admin = app.login(ADMIN_EMAIL, PASSWORD).await;

    app.delete_as("/api/v1/users/1", None, &hr)
        .await
        .assert_forbidden();
    app.delete_as("/api/v1/users/999", None, &admin)
        .await
        .assert_not_found();

    let response = app.delete_as("/api/v1/users/1", None, &admin).await;
    response.assert_no_content();
    assert_eq!(response.cookie("access").unwrap().value(), "");
    assert_eq!(response.cookie("refresh").unwrap().value(), "");

    app.get_as("/api/v1/users/me", &admin)
        .await
        .assert_unauthorized();
}

#[tokio::test]
async fn test_set_password() {
    let app = seeded_app().await;
    create_active_employee(&app.state, "pw@example.com").await;
    let session = app.login("pw@example.com", PASSWORD).await;

    let response = app
        .post_as(
            "/api/v1/users/set_password",
            json!({
                "current_password": "not-my-password",
                "new_password": "Fresh-password-9",
                "re_new_password": "Fresh-password-9",
            }),
            &session,
        )
        .await;
    response.assert_bad_request();
    assert_eq!(response.error_message(), "Invalid password.");

    let response = app
        .post_as(
            "/api/v1/users/set_password",
            json!({
                "current_password": PASSWORD,
                "new_password": "12345678901",
                "re_new_password": "12345678901",
            }),
            &session,
        )
        .await;
    response.assert_bad_request();
    assert_eq!(response.error_message(), "This password is entirely numeric.");

    app.post_as(
        "/api/v1/users/set_password",
        json!({
            "current_password": PASSWORD,
            "new_password": "Fresh-password-9",
            "re_new_password": "Fresh-password-9",
        }),
        &session,
    )
    .await
    .assert_no_content();

    app.login("pw@example.com", "Fresh-password-9").await;
}

#[tokio::test]
async fn test_resend_activation_is_admin_only() {
    let app = seeded_app().await;
    create_pending_employee(&app.state, "again@example.com").await;

    let hr = app.login(HR_EMAIL, PASSWORD).await;
    app.post_as(
        "/api/v1/users/resend_activation",
        json!({ "email": "again@example.com" }),
        &hr,
    )
    .await
    .assert_forbidden();

    let admin = app.login(ADMIN_EMAIL, PASSWORD).await;
    app.post_as(
        "/api/v1/users/resend_activation",
        json!({ "email": "again@example.com" }),
        &admin,
    )
    .await
    .assert_no_content();

    let outbox = app.mailer.outbox().await;
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].template_name, "invite");
}

#[tokio::test]
async fn test_detailed_health_probes_database() {
    let app = seeded_app().await;
    let response = app.get("/api/v1/health/detailed").await;
    response.assert_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["status"], "healthy");
    assert!(body["version"].is_string());
}
