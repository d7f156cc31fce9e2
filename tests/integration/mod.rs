//! Integration tests for the onboarding API
//!
//! Each test drives the full router, middleware included, against its own
//! temporary SQLite database.

mod auth_tests;
mod users_tests;
