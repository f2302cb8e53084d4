//! Authentication failures surfaced to the request layer.
//!
//! These are deliberately information-poor. An unknown username and a wrong
//! password produce the same value, lockout does not disclose the remaining
//! time, and throttling does not disclose the window. The request layer can
//! map each variant to a status code without inspecting any payload.

use thiserror::Error;

/// Why an authentication operation was refused.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthError {
    /// Unknown username or wrong password. The two cases are not
    /// distinguishable from the outside.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The account is locked out after repeated failures.
    #[error("Account locked after repeated failed logins")]
    AccountLocked,

    /// Too many recent failures from this source address.
    #[error("Too many failed attempts, try again later")]
    RateLimited,

    /// The presented session token is unknown or expired.
    #[error("Invalid or expired session")]
    Unauthenticated,
}

// Conversion to the crate-level Error type
impl From<AuthError> for crate::Error {
    fn from(err: AuthError) -> Self {
        crate::Error::Auth(err)
    }
}
