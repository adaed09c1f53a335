//! API error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use nervelle_auth::AuthError;
use nervelle_core::CoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", "Forbidden".to_string()),
            ApiError::Core(e) => match e {
                CoreError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
                CoreError::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone())
                }
                CoreError::DuplicateUsername(msg) => {
                    (StatusCode::CONFLICT, "DUPLICATE_USERNAME", msg.clone())
                }
                CoreError::Unauthenticated => (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    "Authentication required".to_string(),
                ),
                CoreError::Forbidden => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", "Forbidden".to_string())
                }
                CoreError::Auth(e) => auth_parts(e),
                CoreError::Database(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error".to_string(),
                ),
            },
            ApiError::Auth(e) => auth_parts(e),
        }
    }
}

fn auth_parts(e: &AuthError) -> (StatusCode, &'static str, String) {
    let status = e.status_code();
    let code = match e {
        AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
        AuthError::Forbidden => "FORBIDDEN",
        _ if status.is_server_error() => "INTERNAL_ERROR",
        _ => "UNAUTHORIZED",
    };
    let message = if status.is_server_error() {
        "Internal error".to_string()
    } else {
        e.to_string()
    };
    (status, code, message)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = axum::Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
