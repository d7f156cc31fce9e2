//! Step definitions for Cucumber scenarios

pub mod common_steps;
pub mod session_steps;
