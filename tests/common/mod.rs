//! Common test utilities and helpers
//!
//! - Test application with a temporary database and captured mail
//! - Fixtures and factories
//! - Mock mail backend

#![allow(dead_code)]

pub mod factories;
pub mod fixtures;
pub mod test_app;

pub use factories::*;
pub use fixtures::*;
pub use mocks::*;
pub use test_app::*;
