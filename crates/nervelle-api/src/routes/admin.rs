//! Admin user management routes

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use nervelle_core::UserUpdate;
use nervelle_db::UserRole;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::flash::{Level, set_notice, take_notice};
use crate::session::set_session_cookie;
use crate::state::AppState;
use crate::views::{EditUserForm, Empty, Page, UserSummary};

use super::auth::RequireAdmin;
use super::{form_error, non_empty};

/// Create user form submission
#[derive(Deserialize)]
pub struct CreateUserForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub site_link: Option<String>,
}

/// Edit user form submission
///
/// A blank password leaves the password unchanged; a blank site link clears it.
#[derive(Deserialize)]
pub struct UpdateUserForm {
    #[serde(default)]
    pub site_link: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// GET /admin/create (Admin only)
async fn create_user_page(
    _admin: RequireAdmin,
    jar: CookieJar,
) -> (CookieJar, Json<Page<Empty>>) {
    let (jar, notice) = take_notice(jar);
    (jar, Json(Page::new("create_user", notice, Empty {})))
}

/// POST /admin/create (Admin only)
async fn create_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CreateUserForm>,
) -> Result<(CookieJar, Redirect), ApiError> {
    debug!("Admin {} creating user: {}", admin.username, form.username);

    match state
        .users
        .create_user(&form.username, &form.password, form.site_link.as_deref())
        .await
    {
        Ok(user) => {
            let jar = set_notice(
                jar,
                Level::Success,
                format!("User {} created.", user.username),
            );
            Ok((jar, Redirect::to("/admin")))
        }
        Err(e) => form_error(jar, e, "/admin/create"),
    }
}

/// GET /admin/edit/{id} (Admin only)
async fn edit_user_page(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Page<EditUserForm>>), ApiError> {
    let user = state.users.get_user(id).await?;
    let (jar, notice) = take_notice(jar);

    Ok((
        jar,
        Json(Page::new(
            "edit_user",
            notice,
            EditUserForm {
                user: UserSummary::from(&user),
            },
        )),
    ))
}

/// POST /admin/edit/{id} (Admin only)
async fn update_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    jar: CookieJar,
    Form(form): Form<UpdateUserForm>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let target = state.users.get_user(id).await?;
    let back_to = format!("/admin/edit/{}", id);

    let role = match non_empty(form.role).map(|r| r.parse::<UserRole>()).transpose() {
        Ok(role) => role,
        Err(e) => {
            let jar = set_notice(jar, Level::Error, e.to_string());
            return Ok((jar, Redirect::to(&back_to)));
        }
    };
    let password = non_empty(form.password);
    let rotates = password.is_some() || role.is_some_and(|r| r != target.role);

    let update = UserUpdate {
        site_link: form.site_link,
        password,
        role,
    };

    let user = match state.users.update_user(id, update).await {
        Ok(user) => user,
        Err(e) => return form_error(jar, e, &back_to),
    };

    let mut jar = set_notice(
        jar,
        Level::Success,
        format!("User {} updated.", user.username),
    );

    // Editing one's own password or role ends the current session; start a new one
    if user.id == admin.id && rotates {
        info!("Admin {} changed own credentials, rotating session", admin.username);
        let session = state.auth.issue_session(user).await?;
        jar = set_session_cookie(jar, &session, state.secure_cookies);
        return Ok((jar, Redirect::to("/")));
    }

    Ok((jar, Redirect::to("/admin")))
}

/// POST /admin/delete/{id} (Admin only)
async fn delete_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    debug!("Admin {} deleting user: {}", admin.username, id);

    match state.users.delete_user(id).await {
        Ok(()) => {
            let jar = set_notice(jar, Level::Success, "User deleted.");
            Ok((jar, Redirect::to("/admin")))
        }
        Err(e) => form_error(jar, e, "/admin"),
    }
}

/// Create admin routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/create", get(create_user_page).post(create_user))
        .route("/admin/edit/{id}", get(edit_user_page).post(update_user))
        .route("/admin/delete/{id}", post(delete_user))
}
