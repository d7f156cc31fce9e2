//! Cucumber support code and step definitions

pub mod step_definitions;

pub use support::TestWorld;
