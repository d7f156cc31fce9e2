//! Input validation utilities

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::{AppError, AppResult};

/// International phone number: optional `+`, no leading zero, 8 to 15 digits
pub static PHONE_NUMBER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[1-9][0-9]{7,14}$").unwrap());

/// ISO 3166-1 alpha-2 country code
static COUNTRY_CODE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}$").unwrap());

/// Validate a phone number
pub fn validate_phone_number(phone: &str) -> bool {
    PHONE_NUMBER_REGEX.is_match(phone)
}

/// Validate a nationality given as a country code
pub fn validate_country_code(code: &str) -> bool {
    COUNTRY_CODE_REGEX.is_match(code)
}

/// Normalize an email address: trim, lowercase the domain part.
///
/// The local part keeps its case; lookups are case-insensitive at the
/// database level.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// First letter uppercase, the remainder lowercase
pub fn capitalize(value: &str) -> String {
    let mut chars = value.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Check a short organisation code (department / employee type)
pub fn validate_short_code(field: &str, code: &str, max_len: usize) -> AppResult<()> {
    let len = code.chars().count();
    if len == 0 || len > max_len {
        return Err(AppError::Validation(format!(
            "{} must be between 1 and {} characters",
            field, max_len
        )));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::Validation(format!(
            "{} must be alphanumeric",
            field
        )));
    }
    Ok(())
}

/// Check a new password against the configured policy
pub fn validate_new_password(
    new_password: &str,
    re_new_password: &str,
    min_length: usize,
) -> AppResult<()> {
    if new_password != re_new_password {
        return Err(AppError::Validation(
            "The two password fields didn't match.".to_string(),
        ));
    }
    if new_password.chars().count() < min_length {
        return Err(AppError::Validation(format!(
            "This password is too short. It must contain at least {} characters.",
            min_length
        )));
    }
    if new_password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "This password is entirely numeric.".to_string(),
        ));
    }
    Ok(())
}
