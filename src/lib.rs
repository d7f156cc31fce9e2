//! HR onboarding backend
//!
//! Employee records, email invitations with signed activation links and
//! cookie-based JWT sessions.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use db::DbPool;
pub use middleware::{auth_middleware, Claims};
use services::Mailer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Database connection pool
    pub db: DbPool,
    /// Outgoing mail capability
    pub mailer: Arc<dyn Mailer>,
}
