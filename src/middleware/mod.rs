//! Middleware components
//!
//! This module contains middleware for:
//! - Authentication (JWT session cookies)
//! - Authorization (RBAC)

pub mod auth;
pub mod rbac;

pub use auth::{auth_middleware, AuthError, Claims, TokenType};
pub use rbac::require;
