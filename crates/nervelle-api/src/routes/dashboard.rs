//! Role dashboards

use axum::{Json, Router, extract::State, routing::get};
use axum_extra::extract::cookie::CookieJar;

use crate::error::ApiError;
use crate::flash::take_notice;
use crate::state::AppState;
use crate::views::{AdminDashboard, ClientDashboard, Page, UserSummary};

use super::auth::{RequireAdmin, RequireClient};

/// GET /admin (Admin only)
async fn admin_dashboard(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Page<AdminDashboard>>), ApiError> {
    let users = state.users.list_non_admin_users().await?;
    let (jar, notice) = take_notice(jar);

    Ok((
        jar,
        Json(Page::new(
            "admin",
            notice,
            AdminDashboard {
                username: admin.username,
                users: users.iter().map(UserSummary::from).collect(),
            },
        )),
    ))
}

/// GET /client (standard users only)
async fn client_dashboard(
    RequireClient(user): RequireClient,
    jar: CookieJar,
) -> (CookieJar, Json<Page<ClientDashboard>>) {
    let (jar, notice) = take_notice(jar);

    (
        jar,
        Json(Page::new(
            "client",
            notice,
            ClientDashboard {
                username: user.username,
                site_link: user.site_link,
            },
        )),
    )
}

/// Create dashboard routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(admin_dashboard))
        .route("/client", get(client_dashboard))
}
