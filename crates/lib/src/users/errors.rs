//! Errors for user account management operations.
//!
//! This module defines structured errors for the credential store,
//! following the error handling strategy of scoping errors per module.

use thiserror::Error;

/// Errors that can occur during user account operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UserError {
    /// The requested username is already registered.
    #[error("Username already exists: {username}")]
    UsernameTaken {
        /// The username that was requested
        username: String,
    },
}

impl UserError {
    /// Check if this error indicates a uniqueness conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, UserError::UsernameTaken { .. })
    }
}

// Conversion to the crate-level Error type
impl From<UserError> for crate::Error {
    fn from(err: UserError) -> Self {
        crate::Error::User(err)
    }
}
