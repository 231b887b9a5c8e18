use crate::error::{AccountError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Input validation and normalization for account fields

// Compile regex patterns once at startup
// These patterns are hardcoded and always valid, so we use expect() with explicit reasoning
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
        .expect("hardcoded email regex is invalid - fix source code")
});

pub const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_EMAIL_LENGTH: usize = 254;

/// Trimmed, lower-cased email used as the uniqueness key
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_string()
}

/// Validate email format (RFC 5322 simplified)
pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= MAX_EMAIL_LENGTH && EMAIL_REGEX.is_match(email)
}

/// Expects an already normalized name
pub fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AccountError::validation("name", "must not be empty"));
    }
    Ok(())
}

/// Expects an already normalized email
pub fn check_email(email: &str) -> Result<()> {
    if !validate_email(email) {
        return Err(AccountError::validation("email", "must be a valid email address"));
    }
    Ok(())
}

pub fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AccountError::validation(
            "password",
            format!("must be at least {} characters", MIN_PASSWORD_LENGTH),
        ));
    }
    Ok(())
}
