//! Input validation for identities and credentials.
//!
//! All user-supplied strings pass through here before touching storage. The
//! service layer applies the full rule set; the credential store re-applies
//! the shape checks so no code path can insert a malformed row.

use thiserror::Error;

/// Username length bounds (inclusive).
pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 50;

/// Minimum password length.
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Minimum API key length.
pub const API_KEY_MIN_LENGTH: usize = 10;

/// A rejected input, with the field and the rule it broke.
///
/// Messages name the rule, never the submitted value.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    /// The username fails the length or charset rules.
    #[error("Invalid username: {reason}")]
    Username {
        /// The rule that was broken
        reason: &'static str,
    },

    /// The password fails the length or complexity rules.
    #[error("Invalid password: {reason}")]
    Password {
        /// The rule that was broken
        reason: &'static str,
    },

    /// The API key fails the length or charset rules.
    #[error("Invalid API key: {reason}")]
    ApiKey {
        /// The rule that was broken
        reason: &'static str,
    },
}

// Conversion to the crate-level Error type
impl From<ValidationError> for crate::Error {
    fn from(err: ValidationError) -> Self {
        crate::Error::Validation(err)
    }
}

/// Check a username: 3 to 50 characters, letters, digits, and underscores.
pub fn username(username: &str) -> Result<(), ValidationError> {
    let length = username.chars().count();
    if !(USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&length) {
        return Err(ValidationError::Username {
            reason: "must be 3 to 50 characters",
        });
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ValidationError::Username {
            reason: "may only contain letters, digits, and underscores",
        });
    }
    Ok(())
}

/// Check the password length rule on its own.
///
/// The credential store uses this as its shape check; complexity is a
/// service-level concern.
pub fn password_min_length(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(ValidationError::Password {
            reason: "must be at least 8 characters",
        });
    }
    Ok(())
}

/// Check a password: at least 8 characters with an uppercase letter, a
/// lowercase letter, and a digit.
pub fn password(password: &str) -> Result<(), ValidationError> {
    password_min_length(password)?;
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(ValidationError::Password {
            reason: "must contain an uppercase letter",
        });
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(ValidationError::Password {
            reason: "must contain a lowercase letter",
        });
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::Password {
            reason: "must contain a digit",
        });
    }
    Ok(())
}

/// Check an API key: at least 10 characters, letters, digits, and hyphens.
pub fn api_key(api_key: &str) -> Result<(), ValidationError> {
    if api_key.chars().count() < API_KEY_MIN_LENGTH {
        return Err(ValidationError::ApiKey {
            reason: "must be at least 10 characters",
        });
    }
    if !api_key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::ApiKey {
            reason: "may only contain letters, digits, and hyphens",
        });
    }
    Ok(())
}
