//! Nervelle Authentication and Authorization
//!
//! This crate provides argon2 password hashing, signed session tokens and
//! the session authenticator that binds a token to a stored user and role.

pub mod authenticator;
pub mod error;
pub mod jwt;
pub mod password;

pub use authenticator::{MAX_PASSWORD_LENGTH, SessionAuthenticator, SessionToken};
pub use error::AuthError;
pub use jwt::{Claims, JwtManager};
pub use password::{hash_password, verify_password};
