//! JSON view models returned by the page routes

use nervelle_db::User;
use serde::Serialize;

use crate::flash::Notice;

/// Envelope shared by every page: view name, pending notice, page data
#[derive(Serialize)]
pub struct Page<T: Serialize> {
    pub view: &'static str,
    pub notice: Option<Notice>,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> Page<T> {
    pub fn new(view: &'static str, notice: Option<Notice>, data: T) -> Self {
        Self { view, notice, data }
    }
}

/// Page without data of its own
#[derive(Serialize)]
pub struct Empty {}

/// User row as listed on the admin dashboard (without password hash)
#[derive(Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub site_link: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role.as_str().to_string(),
            site_link: user.site_link.clone(),
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct AdminDashboard {
    pub username: String,
    pub users: Vec<UserSummary>,
}

#[derive(Serialize)]
pub struct ClientDashboard {
    pub username: String,
    pub site_link: Option<String>,
}

#[derive(Serialize)]
pub struct EditUserForm {
    pub user: UserSummary,
}

#[derive(Serialize)]
pub struct AccountForm {
    pub user: UserSummary,
}
