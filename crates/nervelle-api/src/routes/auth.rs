//! Authentication extractors and routes

use axum::{
    Form, Json, Router,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, request::Parts},
    response::Redirect,
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use nervelle_auth::AuthError;
use nervelle_db::{User, UserRole};
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;
use crate::flash::{Level, set_notice, take_notice};
use crate::session::{SESSION_COOKIE, clear_session_cookie, session_token, set_session_cookie};
use crate::state::AppState;
use crate::views::{Empty, Page};

// ==================== Auth Extractors ====================

/// Extractor for any authenticated user (required)
pub struct RequireAuth(pub User);

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let token = session_token(&parts.headers);

        let user = app_state
            .auth
            .current_principal(token.as_deref())
            .await?
            .ok_or(ApiError::Unauthorized)?;

        debug!("Authenticated user: {} ({})", user.username, user.role);
        Ok(RequireAuth(user))
    }
}

async fn require_role<S>(parts: &Parts, state: &S, role: UserRole) -> Result<User, ApiError>
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    let app_state = AppState::from_ref(state);
    let token = session_token(&parts.headers);

    app_state
        .auth
        .require_role(token.as_deref(), role)
        .await
        .map_err(|e| match e {
            AuthError::Unauthenticated => ApiError::Unauthorized,
            AuthError::Forbidden => ApiError::Forbidden,
            other => ApiError::Auth(other),
        })
}

/// Extractor for admin user (required)
pub struct RequireAdmin(pub User);

impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, UserRole::Admin).await.map(RequireAdmin)
    }
}

/// Extractor for standard (client) user (required)
pub struct RequireClient(pub User);

impl<S> FromRequestParts<S> for RequireClient
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, UserRole::Client).await.map(RequireClient)
    }
}

/// Landing page for a role
pub(crate) fn dashboard_path(role: UserRole) -> &'static str {
    match role {
        UserRole::Admin => "/admin",
        UserRole::Client => "/client",
    }
}

// ==================== Auth Routes ====================

/// Login form submission
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// GET /
async fn home(State(state): State<AppState>, headers: HeaderMap) -> Result<Redirect, ApiError> {
    let token = session_token(&headers);
    let user = state.auth.current_principal(token.as_deref()).await?;

    Ok(Redirect::to(match user {
        Some(user) => dashboard_path(user.role),
        None => "/login",
    }))
}

/// GET /login
async fn login_page(jar: CookieJar) -> (CookieJar, Json<Page<Empty>>) {
    let (jar, notice) = take_notice(jar);
    (jar, Json(Page::new("login", notice, Empty {})))
}

/// POST /login
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect), ApiError> {
    match state.auth.login(&form.username, &form.password).await {
        Ok(session) => {
            metrics::counter!("nervelle_logins_total", "outcome" => "success").increment(1);

            // A new login replaces whatever session the browser held
            let previous = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
            state.auth.logout(previous.as_deref()).await?;

            let jar = set_session_cookie(jar, &session, state.secure_cookies);
            let jar = set_notice(jar, Level::Success, "Login successful! Redirecting...");
            Ok((jar, Redirect::to(dashboard_path(session.user.role))))
        }
        Err(AuthError::InvalidCredentials) => {
            metrics::counter!("nervelle_logins_total", "outcome" => "failure").increment(1);

            let jar = set_notice(
                jar,
                Level::Error,
                "Invalid username or password. Please try again.",
            );
            Ok((jar, Redirect::to("/login")))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /logout
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    let token = session_token(&headers);
    state.auth.logout(token.as_deref()).await?;

    let jar = clear_session_cookie(jar);
    let jar = set_notice(jar, Level::Info, "You have been logged out.");
    Ok((jar, Redirect::to("/login")))
}

/// Create auth routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
}
