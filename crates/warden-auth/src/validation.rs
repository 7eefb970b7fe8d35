//! Input validation for account requests

use warden_db::UserRole;

use crate::error::AuthError;

/// Minimum/maximum length of first and last names
const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 100;
/// Password bounds; the upper bound keeps hashing cost in check
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 256;
const MAX_EMAIL_LENGTH: usize = 254;
const MAX_PHONE_LENGTH: usize = 20;

fn invalid(msg: impl Into<String>) -> AuthError {
    AuthError::Validation(msg.into())
}

/// Trim and lowercase an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate a display name field
pub fn validate_name(field: &str, value: &str) -> Result<(), AuthError> {
    let len = value.chars().count();
    if len < MIN_NAME_LENGTH || len > MAX_NAME_LENGTH {
        return Err(invalid(format!(
            "{} must be between {} and {} characters",
            field, MIN_NAME_LENGTH, MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

/// Validate the shape of an (already normalized) email address
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    if email.is_empty() {
        return Err(invalid("email is required"));
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(invalid(format!(
            "email exceeds maximum length of {} characters",
            MAX_EMAIL_LENGTH
        )));
    }

    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !well_formed {
        return Err(invalid("email is not a valid address"));
    }
    Ok(())
}

/// Validate a phone number: digits with optional `+`, `-`, spaces and parentheses
pub fn validate_phone(phone: &str) -> Result<(), AuthError> {
    if phone.is_empty() {
        return Err(invalid("phone is required"));
    }
    if phone.len() > MAX_PHONE_LENGTH {
        return Err(invalid(format!(
            "phone exceeds maximum length of {} characters",
            MAX_PHONE_LENGTH
        )));
    }
    if !phone.chars().any(|c| c.is_ascii_digit())
        || !phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
    {
        return Err(invalid("phone is not a valid number"));
    }
    Ok(())
}

/// Validate password length
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(invalid(format!(
            "password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(invalid(format!(
            "password exceeds maximum length of {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// Parse a requested role; omitted means [`UserRole::User`]
pub fn parse_role(role: Option<&str>) -> Result<UserRole, AuthError> {
    match role {
        None => Ok(UserRole::User),
        Some(s) => s.parse().map_err(|_| invalid(format!("role '{}' is not recognised", s))),
    }
}
