//! Input validation for provisioning and account flows.
//!
//! Every check runs before any external effect. Functions that accept an
//! email return the normalised (lower-cased, trimmed) form callers must use.
use crate::error::{Result, ServiceError};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}$")
        .expect("hardcoded email regex is invalid - fix source code")
});

static DIGITS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("hardcoded digits regex is invalid"));

pub const MIN_PASSWORD_LEN: usize = 8;

/// Validate and normalise an email address.
pub fn normalize_email(email: &str) -> Result<String> {
    let lowered = email.trim().to_lowercase();
    if lowered.is_empty() || lowered.len() > 254 || !EMAIL_REGEX.is_match(&lowered) {
        return Err(ServiceError::Validation("Invalid email".to_string()));
    }
    Ok(lowered)
}

pub fn validate_email(email: &str) -> bool {
    normalize_email(email).is_ok()
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ServiceError::Validation("Invalid password".to_string()));
    }
    Ok(())
}

pub fn validate_length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ServiceError::Validation(format!("Invalid {} length", field)));
    }
    Ok(())
}

/// Name used at sign-up time (identity attribute).
pub fn validate_display_name(name: &str) -> Result<()> {
    validate_length("name", name, 3, 50)
}

/// Name stored on the local profile.
pub fn validate_profile_name(name: &str) -> Result<()> {
    validate_length("name", name, 3, 100)
}

pub fn validate_phone(phone: &str) -> Result<()> {
    validate_length("phone number", phone, 10, 15)
}

pub fn validate_required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// MFA and verification codes are numeric.
pub fn validate_numeric_code(code: &str) -> Result<()> {
    if !DIGITS_REGEX.is_match(code) {
        return Err(ServiceError::Validation("Code must be numeric".to_string()));
    }
    Ok(())
}

/// Mask email for logging
pub fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return "***@***".to_string();
    };
    let mut chars = local.chars();
    match (chars.next(), chars.nth(1)) {
        (Some(first), Some(_)) => format!("{}***@{}", first, domain),
        _ => format!("**@{}", domain),
    }
}
