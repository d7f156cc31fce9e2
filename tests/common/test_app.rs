//! Test application setup utilities
//!
//! Drives the full router through `tower::ServiceExt::oneshot` against a
//! temporary SQLite file, with mail captured in memory.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use axum_extra::extract::cookie::Cookie;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use hr_onboarding::{
    api,
    config::{AppConfig, DatabaseConfig, MailBackend},
    db,
    services::{Mailer, MemoryMailer},
    AppState,
};

/// Test application wrapper for integration testing
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    /// Outbox of the default mailer; stays empty when a custom mailer is used
    pub mailer: MemoryMailer,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let mailer = MemoryMailer::new();
        Self::build(config, Arc::new(mailer.clone()), mailer).await
    }

    /// Use a specific mail backend, e.g. one that always fails
    pub async fn with_mailer(mailer: Arc<dyn Mailer>) -> Self {
        Self::build(test_config(), mailer, MemoryMailer::new()).await
    }

    async fn build(config: AppConfig, mailer: Arc<dyn Mailer>, outbox: MemoryMailer) -> Self {
        let db = db::init_pool(&config.database)
            .await
            .expect("Failed to initialize test database");

        let state = AppState { config, db, mailer };
        let router = api::router(state.clone());

        Self {
            router,
            state,
            mailer: outbox,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None, None).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body), None).await
    }

    pub async fn get_as(&self, uri: &str, session: &Session) -> TestResponse {
        self.send(Method::GET, uri, None, Some(session)).await
    }

    pub async fn post_as(&self, uri: &str, body: Value, session: &Session) -> TestResponse {
        self.send(Method::POST, uri, Some(body), Some(session)).await
    }

    pub async fn patch_as(&self, uri: &str, body: Value, session: &Session) -> TestResponse {
        self.send(Method::PATCH, uri, Some(body), Some(session)).await
    }

    pub async fn delete_as(&self, uri: &str, body: Option<Value>, session: &Session) -> TestResponse {
        self.send(Method::DELETE, uri, body, Some(session)).await
    }

    /// Build and send a request, attaching the session cookies when given
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        session: Option<&Session>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(session) = session {
            builder = builder.header(header::COOKIE, session.cookie_header(&self.state.config));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.request(request).await
    }

    /// Send a request with a raw `Cookie` header
    pub async fn post_with_cookie(&self, uri: &str, cookie: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::COOKIE, cookie);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        self.request(request).await
    }

    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Log in and keep the cookies the server set
    pub async fn login(&self, email: &str, password: &str) -> Session {
        let response = self
            .post_json(
                "/api/v1/auth/login",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        response.assert_ok();

        let cookies = &self.state.config.cookies;
        Session {
            access: response
                .cookie(&cookies.access_name)
                .expect("login sets the access cookie")
                .value()
                .to_string(),
            refresh: response
                .cookie(&cookies.refresh_name)
                .expect("login sets the refresh cookie")
                .value()
                .to_string(),
        }
    }
}

/// Session cookies held by a test client
#[derive(Debug, Clone)]
pub struct Session {
    pub access: String,
    pub refresh: String,
}

impl Session {
    pub fn cookie_header(&self, config: &AppConfig) -> String {
        format!(
            "{}={}; {}={}",
            config.cookies.access_name, self.access, config.cookies.refresh_name, self.refresh
        )
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: bytes::Bytes,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse response as JSON")
    }

    /// The `message` of an error body
    pub fn error_message(&self) -> String {
        let body: Value = self.json();
        body["message"].as_str().unwrap_or_default().to_string()
    }

    /// A cookie from the `Set-Cookie` headers
    pub fn cookie(&self, name: &str) -> Option<Cookie<'static>> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| Cookie::parse(value.to_string()).ok())
            .find(|cookie| cookie.name() == name)
    }

    pub fn sets_cookies(&self) -> bool {
        self.headers.get(header::SET_COOKIE).is_some()
    }

    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    pub fn assert_created(&self) -> &Self {
        self.assert_status(StatusCode::CREATED)
    }

    pub fn assert_no_content(&self) -> &Self {
        self.assert_status(StatusCode::NO_CONTENT)
    }

    pub fn assert_bad_request(&self) -> &Self {
        self.assert_status(StatusCode::BAD_REQUEST)
    }

    pub fn assert_unauthorized(&self) -> &Self {
        self.assert_status(StatusCode::UNAUTHORIZED)
    }

    pub fn assert_forbidden(&self) -> &Self {
        self.assert_status(StatusCode::FORBIDDEN)
    }

    pub fn assert_not_found(&self) -> &Self {
        self.assert_status(StatusCode::NOT_FOUND)
    }
}

/// Test configuration on a temporary SQLite file
pub fn test_config() -> AppConfig {
    let db_path = format!(
        "/tmp/hr_onboarding_test_{}.db",
        Uuid::new_v4().to_string().replace('-', "")
    );

    let mut config = AppConfig::default();
    config.database = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", db_path),
        max_connections: 1,
        min_connections: 1,
        connect_timeout_secs: 30,
        idle_timeout_secs: 600,
    };
    config.auth.jwt_secret = "test_secret_key_that_is_at_least_32_bytes_long".to_string();
    config.mail.backend = MailBackend::Memory;
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_app_creation() {
        let app = TestApp::new().await;
        assert!(app.mailer.outbox().await.is_empty());
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = TestApp::new().await;
        let response = app.get("/api/v1/health").await;
        response.assert_ok();
        let json: Value = response.json();
        assert_eq!(json["status"], "healthy");
    }
}
