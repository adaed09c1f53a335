//! Nervelle Database Layer
//!
//! This crate provides the credential store for Nervelle: the `users`
//! table and the server-side `sessions` table, persisted in SQLite via sqlx.

pub mod error;
pub mod models;
pub mod repository;
pub mod utils;

pub use error::DbError;
pub use models::*;
pub use repository::Database;
