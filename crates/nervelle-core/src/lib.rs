//! Nervelle Core Business Logic
//!
//! This crate provides the credential store service (user CRUD, input
//! validation, admin bootstrap) and background session maintenance.

pub mod error;
pub mod maintenance;
pub mod users;
pub mod validation;

pub use error::CoreError;
pub use maintenance::spawn_session_cleanup_task;
pub use users::{ProfileUpdate, UserInfoView, UserService, UserUpdate};
