//! Error types and handling
//!
//! Every failure that crosses the HTTP boundary is an [`AppError`]. Each variant
//! maps to one status code and is rendered as the same JSON body shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad or duplicate input (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Bad credentials, or an invalid/expired token (401)
    #[error("Unauthorized: {0}")]
    Authentication(String),

    /// Insufficient role (403)
    #[error("Forbidden: {0}")]
    Authorization(String),

    /// Unknown id or failed lookup (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// State transition that does not apply, e.g. activating an active user (400)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The mail capability refused or failed to deliver (400)
    #[error("Mail delivery failed: {0}")]
    MailDeliveryFailed(String),

    /// Anything unexpected (500). The message is logged, never returned.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Error code for programmatic handling (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
            code: None,
        }
    }

    /// Add details to the error response
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Add an error code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl AppError {
    /// Status code and stable error identifier for this error
    pub fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Conflict(_) => (StatusCode::BAD_REQUEST, "conflict"),
            AppError::MailDeliveryFailed(_) => (StatusCode::BAD_REQUEST, "mail_delivery_failed"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    /// Message safe to return to the client
    fn public_message(&self) -> String {
        match self {
            AppError::Validation(m)
            | AppError::Authentication(m)
            | AppError::Authorization(m)
            | AppError::NotFound(m)
            | AppError::Conflict(m)
            | AppError::MailDeliveryFailed(m) => m.clone(),
            AppError::Internal(_) => "An unexpected error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_kind();

        match &self {
            AppError::Internal(_) => error!(error = %self, error_type, "Request error"),
            AppError::Authorization(_) | AppError::MailDeliveryFailed(_) => {
                tracing::warn!(error = %self, error_type, "Request refused")
            }
            _ => {}
        }

        let body = ErrorResponse::new(error_type, self.public_message());

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Repositories attach context to sqlx errors; constraint failures
        // still have to reach the client as validation errors.
        if let Some(mapped) = err.downcast_ref::<sqlx::Error>().and_then(constraint_error) {
            return mapped;
        }
        AppError::Internal(format!("{:#}", err))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(mapped) = constraint_error(&err) {
            return mapped;
        }
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            _ => AppError::Internal(err.to_string()),
        }
    }
}

/// Map database constraint failures to validation errors
fn constraint_error(err: &sqlx::Error) -> Option<AppError> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    let message = db_err.message();
    if let Some(columns) = message.strip_prefix("UNIQUE constraint failed: ") {
        Some(AppError::Validation(unique_violation_message(columns)))
    } else if message.contains("employee_number is immutable") {
        Some(AppError::Validation(
            "employee_number cannot be changed".to_string(),
        ))
    } else {
        None
    }
}

/// Turn `employees.phone_number` into "employee with this phone number already exists."
fn unique_violation_message(columns: &str) -> String {
    let first = columns.split(',').next().unwrap_or(columns).trim();
    let (table, column) = first.split_once('.').unwrap_or(("record", first));
    let entity = match table {
        "users" => "user",
        "employees" => "employee",
        "jobs" => "job",
        "departments" => "department",
        "employee_types" => "employee type",
        _ => "record",
    };
    let field = match column {
        "head_id" => "head".to_string(),
        other => other.replace('_', " "),
    };
    format!("{} with this {} already exists.", entity, field)
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Result type alias for handlers and services
pub type AppResult<T> = Result<T, AppError>;
