//! Application state

use nervelle_auth::SessionAuthenticator;
use nervelle_core::UserService;
use nervelle_db::Database;

/// Prometheus render handle used by the `/metrics` route
pub type MetricsHandle = metrics_exporter_prometheus::PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: SessionAuthenticator,
    pub users: UserService,
    /// Mark cookies `Secure` (serve over HTTPS only)
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(
        db: Database,
        auth: SessionAuthenticator,
        users: UserService,
        secure_cookies: bool,
    ) -> Self {
        Self {
            db,
            auth,
            users,
            secure_cookies,
        }
    }
}
