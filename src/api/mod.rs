//! API routes and handlers
//!
//! Everything is served under `/api/v1`. Public routes cover health, the
//! session endpoints, activation and password reset; the rest sits behind
//! [`auth_middleware`].

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};

use crate::{middleware::auth_middleware, AppState};

mod auth;
mod employees;
mod health;
mod users;

pub use health::{health_check, health_check_detailed};

/// Public API routes (no authentication required)
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/detailed", get(health::health_check_detailed))
        .nest("/auth", auth::public_routes())
        .nest("/users", users::public_routes())
}

/// Protected API routes (authentication required)
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .nest("/users", users::routes())
        .nest("/employees", employees::routes())
}

/// The whole application: both route sets, the auth layer on the protected
/// one, plus tracing and CORS
pub fn router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .nest("/api/v1", public_routes())
        .nest(
            "/api/v1",
            protected_routes().layer(axum::middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state.clone())
        .layer(trace_layer)
        .layer(cors_layer(&state.config.server.cors_origins))
}

/// Cookies only cross origins with credentials allowed, which rules out
/// wildcard origins; only the configured ones are accepted.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
