//! Machine-readable user lookup

use axum::{Json, Router, extract::State, http::HeaderMap, routing::get};
use nervelle_core::UserInfoView;

use crate::error::ApiError;
use crate::session::session_token;
use crate::state::AppState;

/// GET /api/user-info
async fn user_info(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserInfoView>, ApiError> {
    let token = session_token(&headers);
    let principal = state.auth.current_principal(token.as_deref()).await?;

    Ok(Json(state.users.get_user_info(principal.as_ref())?))
}

/// Create user-info routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/user-info", get(user_info))
}
