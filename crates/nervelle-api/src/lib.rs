//! Nervelle HTTP API
//!
//! This crate provides the Axum router for Nervelle: login and logout,
//! role-routed dashboards, admin user management, self-service account
//! edits and the machine-readable user-info endpoint.

pub mod error;
pub mod flash;
pub mod routes;
pub mod session;
pub mod state;
pub mod views;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, MetricsHandle};
