//! Timestamp column helpers

use chrono::{DateTime, Utc};

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an RFC 3339 audit timestamp, falling back to the current time
pub fn parse_datetime_or_now(s: &str) -> DateTime<Utc> {
    parse_rfc3339(s).unwrap_or_else(Utc::now)
}

/// Parse an RFC 3339 expiry; an unreadable value counts as long expired
pub fn parse_expiry(s: &str) -> DateTime<Utc> {
    parse_rfc3339(s).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
