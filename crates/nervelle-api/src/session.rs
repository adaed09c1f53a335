//! Session cookie handling

use axum::http::{HeaderMap, header::AUTHORIZATION};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use nervelle_auth::SessionToken;

/// Name of the cookie carrying the signed session token
pub const SESSION_COOKIE: &str = "nervelle_session";

/// Pull the session token from a request: `Authorization: Bearer` first, then the cookie
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        return Some(token.trim().to_string());
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Store a freshly issued session in the jar
pub fn set_session_cookie(jar: CookieJar, session: &SessionToken, secure: bool) -> CookieJar {
    let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);

    jar.add(
        Cookie::build((SESSION_COOKIE, session.token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure)
            .max_age(time::Duration::seconds(max_age)),
    )
}

/// Drop the session cookie from the client
pub fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
