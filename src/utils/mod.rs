//! Shared utilities

pub mod error;
pub mod json;
pub mod validation;

pub use error::{AppError, AppResult, ErrorResponse};
pub use json::AppJson;
