//! One-shot notices carried across a redirect
//!
//! A notice is written to a short-lived cookie when a form handler
//! redirects, and consumed (and cleared) by the next view that reads it.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;

const FLASH_COOKIE: &str = "nervelle_flash";
const FLASH_MAX_AGE_SECS: i64 = 60;

/// Notice severity
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Error,
}

impl Level {
    fn as_str(&self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Error => "error",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Level::Success),
            "info" => Some(Level::Info),
            "error" => Some(Level::Error),
            _ => None,
        }
    }
}

/// A user-visible transient message
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

impl Notice {
    fn encode(&self) -> String {
        urlencoding::encode(&format!("{}|{}", self.level.as_str(), self.message)).into_owned()
    }

    fn decode(raw: &str) -> Option<Self> {
        let decoded = urlencoding::decode(raw).ok()?;
        let (level, message) = decoded.split_once('|')?;
        Some(Self {
            level: Level::parse(level)?,
            message: message.to_string(),
        })
    }
}

/// Queue a notice for the next view
pub fn set_notice(jar: CookieJar, level: Level, message: impl Into<String>) -> CookieJar {
    let notice = Notice {
        level,
        message: message.into(),
    };

    jar.add(
        Cookie::build((FLASH_COOKIE, notice.encode()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(FLASH_MAX_AGE_SECS)),
    )
}

/// Consume the pending notice, if any
pub fn take_notice(jar: CookieJar) -> (CookieJar, Option<Notice>) {
    let Some(raw) = jar.get(FLASH_COOKIE).map(|c| c.value().to_string()) else {
        return (jar, None);
    };

    let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
    (jar, Notice::decode(&raw))
}
