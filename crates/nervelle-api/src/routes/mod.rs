//! API routes

mod account;
mod admin;
pub mod auth;
mod dashboard;
mod health;
pub mod metrics;
mod user_info;

use axum::{Router, http::Uri, response::Redirect};
use axum_extra::extract::cookie::CookieJar;
use nervelle_core::CoreError;
use std::sync::Arc;

use crate::error::ApiError;
use crate::flash::{Level, set_notice};
use crate::state::{AppState, MetricsHandle};

pub use auth::{RequireAdmin, RequireAuth, RequireClient};

/// Turn a recoverable form error into a redirect back to the form with a notice
///
/// Anything other than bad input or a taken username is a real failure.
pub(crate) fn form_error(
    jar: CookieJar,
    err: CoreError,
    back_to: &str,
) -> Result<(CookieJar, Redirect), ApiError> {
    let message = match err {
        CoreError::InvalidInput(msg) => msg,
        CoreError::DuplicateUsername(_) => "That username is already taken.".to_string(),
        other => return Err(other.into()),
    };
    Ok((set_notice(jar, Level::Error, message), Redirect::to(back_to)))
}

/// Browsers submit untouched inputs as empty strings
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Fallback for unmatched paths
async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

/// Create the main router
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    let mut router = Router::new()
        // Health check
        .merge(health::routes())
        // Login, logout and role routing
        .merge(auth::routes())
        // Role dashboards
        .merge(dashboard::routes())
        // Admin user management
        .merge(admin::routes())
        // Self-service account edits
        .merge(account::routes())
        // Machine-readable lookup
        .merge(user_info::routes())
        .with_state(state);

    // Add metrics endpoint if handle is provided
    if let Some(handle) = metrics_handle {
        router = router.merge(metrics::routes(handle));
    }

    router.fallback(not_found)
}
