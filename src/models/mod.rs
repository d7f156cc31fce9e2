//! Data models

mod catalog;
mod employee;
mod rbac;
mod user;

pub use catalog::*;
pub use employee::*;
pub use rbac::*;
pub use user::*;
