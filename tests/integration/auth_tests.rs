//! Session endpoint tests: login, refresh, verify, logout

use axum::http::Method;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use hr_onboarding::middleware::{
    auth::{create_access_token, encode_token},
    Claims, TokenType,
};

use crate::common::{create_active_employee, seeded_app, TestApp, ADMIN_EMAIL, PASSWORD};

#[tokio::test]
async fn test_login_sets_http_only_cookies_and_returns_access() {
    let app = seeded_app().await;
    let response = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": ADMIN_EMAIL, "password": PASSWORD }),
        )
        .await;
    response.assert_ok();

    let body: Value = response.json();
    let access = body["access"].as_str().unwrap();
    assert!(body.get("refresh").is_none());

    let access_cookie = response.cookie("access").unwrap();
    let refresh_cookie = response.cookie("refresh").unwrap();
    assert_eq!(access_cookie.value(), access);
    assert_eq!(access_cookie.http_only(), Some(true));
    assert_eq!(refresh_cookie.http_only(), Some(true));
    assert_eq!(access_cookie.path(), Some("/"));
    assert_eq!(
        access_cookie.max_age(),
        Some(time::Duration::seconds(300))
    );
    assert_eq!(
        refresh_cookie.max_age(),
        Some(time::Duration::seconds(86_400))
    );
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let app = seeded_app().await;
    let response = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": "ADMIN@Example.COM", "password": PASSWORD }),
        )
        .await;
    response.assert_ok();
}

#[tokio::test]
async fn test_login_with_wrong_password_sets_no_cookies() {
    let app = seeded_app().await;
    let response = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": ADMIN_EMAIL, "password": "wrong-password" }),
        )
        .await;

    response.assert_unauthorized();
    assert!(!response.sets_cookies());
    assert_eq!(
        response.error_message(),
        "No active account found with the given credentials"
    );
}

#[tokio::test]
async fn test_login_refused_for_pending_employee() {
    let app = seeded_app().await;
    crate::common::create_pending_employee(&app.state, "pending@example.com").await;

    app.post_json(
        "/api/v1/auth/login",
        json!({ "email": "pending@example.com", "password": PASSWORD }),
    )
    .await
    .assert_unauthorized();
}

#[tokio::test]
async fn test_login_with_malformed_body_is_bad_request() {
    let app = seeded_app().await;
    app.post_json("/api/v1/auth/login", json!({ "email": ADMIN_EMAIL }))
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn test_refresh_sets_new_access_cookie() {
    let app = seeded_app().await;
    let session = app.login(ADMIN_EMAIL, PASSWORD).await;

    let response = app
        .post_with_cookie(
            "/api/v1/auth/refresh",
            &format!("refresh={}", session.refresh),
            None,
        )
        .await;
    response.assert_ok();

    let body: Value = response.json();
    let access = body["access"].as_str().unwrap();
    assert_eq!(response.cookie("access").unwrap().value(), access);
    // the refresh token is not rotated
    assert!(response.cookie("refresh").is_none());
}

#[tokio::test]
async fn test_refresh_ignores_token_in_body() {
    let app = seeded_app().await;
    let session = app.login(ADMIN_EMAIL, PASSWORD).await;

    let response = app
        .post_json(
            "/api/v1/auth/refresh",
            json!({ "refresh": session.refresh }),
        )
        .await;
    response.assert_unauthorized();
}

#[tokio::test]
async fn test_refresh_with_expired_cookie_is_rejected() {
    let app = seeded_app().await;
    let secret = &app.state.config.auth.jwt_secret;
    let claims = Claims::new(1, TokenType::Refresh, Utc::now() - Duration::days(3), 86_400);
    let expired = encode_token(&claims, secret).unwrap();

    let response = app
        .post_with_cookie("/api/v1/auth/refresh", &format!("refresh={}", expired), None)
        .await;

    response.assert_unauthorized();
    assert!(response.cookie("access").is_none());
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let app = seeded_app().await;
    let session = app.login(ADMIN_EMAIL, PASSWORD).await;

    app.post_with_cookie(
        "/api/v1/auth/refresh",
        &format!("refresh={}", session.access),
        None,
    )
    .await
    .assert_unauthorized();
}

#[tokio::test]
async fn test_verify_reads_access_cookie() {
    let app = seeded_app().await;
    let session = app.login(ADMIN_EMAIL, PASSWORD).await;

    app.post_with_cookie(
        "/api/v1/auth/verify",
        &format!("access={}", session.access),
        None,
    )
    .await
    .assert_ok();
}

#[tokio::test]
async fn test_verify_prefers_token_in_body() {
    let app = seeded_app().await;
    let session = app.login(ADMIN_EMAIL, PASSWORD).await;

    app.post_with_cookie(
        "/api/v1/auth/verify",
        &format!("access={}", session.access),
        Some(json!({ "token": "garbage" })),
    )
    .await
    .assert_unauthorized();

    app.post_json("/api/v1/auth/verify", json!({ "token": session.access }))
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_verify_rejects_missing_and_expired_tokens() {
    let app = seeded_app().await;
    app.send(Method::POST, "/api/v1/auth/verify", None, None)
        .await
        .assert_unauthorized();

    let secret = &app.state.config.auth.jwt_secret;
    let claims = Claims::new(1, TokenType::Access, Utc::now() - Duration::hours(3), 300);
    let expired = encode_token(&claims, secret).unwrap();
    let response = app
        .post_with_cookie("/api/v1/auth/verify", &format!("access={}", expired), None)
        .await;
    response.assert_unauthorized();
    assert_eq!(response.error_message(), "Token is invalid or expired");
}

#[tokio::test]
async fn test_logout_clears_cookies_without_session() {
    let app = TestApp::new().await;
    let response = app
        .send(Method::POST, "/api/v1/auth/logout", None, None)
        .await;

    response.assert_no_content();
    for name in ["access", "refresh"] {
        let cookie = response.cookie(name).unwrap();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let app = seeded_app().await;
    let session = app.login(ADMIN_EMAIL, PASSWORD).await;

    for _ in 0..2 {
        app.post_as("/api/v1/auth/logout", json!({}), &session)
            .await
            .assert_no_content();
    }
}

#[tokio::test]
async fn test_protected_route_accepts_bearer_header() {
    let app = seeded_app().await;
    let token = create_access_token(1, &app.state.config.auth.jwt_secret, 300).unwrap();

    let request = axum::http::Request::builder()
        .method(Method::GET)
        .uri("/api/v1/users/me")
        .header("Authorization", format!("Bearer {}", token))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.request(request).await;
    response.assert_ok();
    let body: Value = response.json();
    assert_eq!(body["email"], ADMIN_EMAIL);
}

#[tokio::test]
async fn test_protected_route_without_credentials() {
    let app = seeded_app().await;
    let response = app.get("/api/v1/employees").await;
    response.assert_unauthorized();
    assert_eq!(
        response.error_message(),
        "Authentication credentials were not provided."
    );
}

#[tokio::test]
async fn test_refresh_refused_after_deactivation() {
    let app = seeded_app().await;
    let employee = create_active_employee(&app.state, "leaver@example.com").await;
    let session = app.login("leaver@example.com", PASSWORD).await;

    let hr = app.login(crate::common::HR_EMAIL, PASSWORD).await;
    let number = employee.employee.employee_number.clone().unwrap();
    app.delete_as(&format!("/api/v1/employees/{}", number), None, &hr)
        .await
        .assert_no_content();

    app.post_with_cookie(
        "/api/v1/auth/refresh",
        &format!("refresh={}", session.refresh),
        None,
    )
    .await
    .assert_unauthorized();
    app.get_as("/api/v1/users/me", &session)
        .await
        .assert_unauthorized();
}
