//! Self-service account routes

use axum::{Form, Json, Router, extract::State, response::Redirect, routing::get};
use axum_extra::extract::cookie::CookieJar;
use nervelle_core::ProfileUpdate;
use serde::Deserialize;

use crate::error::ApiError;
use crate::flash::{Level, set_notice, take_notice};
use crate::session::set_session_cookie;
use crate::state::AppState;
use crate::views::{AccountForm, Page, UserSummary};

use super::auth::RequireAuth;
use super::{form_error, non_empty};

/// Account form submission
#[derive(Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub site_link: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// GET /account
async fn account_page(
    RequireAuth(user): RequireAuth,
    jar: CookieJar,
) -> (CookieJar, Json<Page<AccountForm>>) {
    let (jar, notice) = take_notice(jar);

    (
        jar,
        Json(Page::new(
            "account",
            notice,
            AccountForm {
                user: UserSummary::from(&user),
            },
        )),
    )
}

/// POST /account
async fn update_account(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ProfileForm>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let password = non_empty(form.password);
    let password_changed = password.is_some();

    let update = ProfileUpdate {
        site_link: form.site_link,
        password,
    };

    let updated = match state.users.update_profile(&user, user.id, update).await {
        Ok(updated) => updated,
        Err(e) => return form_error(jar, e, "/account"),
    };

    let mut jar = set_notice(jar, Level::Success, "Profile updated.");

    // A password change revoked every session, including this one
    if password_changed {
        let session = state.auth.issue_session(updated).await?;
        jar = set_session_cookie(jar, &session, state.secure_cookies);
    }

    Ok((jar, Redirect::to("/account")))
}

/// Create account routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/account", get(account_page).post(update_account))
}
