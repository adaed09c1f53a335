//! Input validation for credential store writes

use crate::error::CoreError;

pub use nervelle_auth::MAX_PASSWORD_LENGTH;

/// Maximum allowed username length
pub const MAX_USERNAME_LENGTH: usize = 64;
/// Maximum allowed site link length
pub const MAX_SITE_LINK_LENGTH: usize = 512;

/// Validate username format and length
pub fn validate_username(username: &str) -> Result<(), CoreError> {
    if username.is_empty() {
        return Err(CoreError::InvalidInput("Username cannot be empty".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(CoreError::InvalidInput(format!(
            "Username exceeds maximum length of {} characters",
            MAX_USERNAME_LENGTH
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(CoreError::InvalidInput(
            "Username can only contain ASCII letters, digits, dots, underscores, and hyphens"
                .to_string(),
        ));
    }
    Ok(())
}

/// Validate password presence and length
pub fn validate_password(password: &str) -> Result<(), CoreError> {
    if password.is_empty() {
        return Err(CoreError::InvalidInput("Password cannot be empty".to_string()));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(CoreError::InvalidInput(format!(
            "Password exceeds maximum length of {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// Normalize a site link: surrounding whitespace is dropped and blank means "no link"
pub fn normalize_site_link(site_link: &str) -> Result<Option<String>, CoreError> {
    let trimmed = site_link.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.len() > MAX_SITE_LINK_LENGTH {
        return Err(CoreError::InvalidInput(format!(
            "Site link exceeds maximum length of {} characters",
            MAX_SITE_LINK_LENGTH
        )));
    }
    Ok(Some(trimmed.to_string()))
}
