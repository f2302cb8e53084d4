//!
//! Portcullis: an embedded credential and session vault.
//! This library guards a proxied portfolio API: it keeps user accounts with
//! their sealed upstream API keys, authenticates logins, and hands out
//! opaque bearer sessions for the surrounding request layer to check.
//!
//! ## Core Concepts
//!
//! * **Vault (`vault::Vault`)**: The entry point. Opening one loads or creates the master key, opens the database, and exposes every operation the request layer needs: register, login, logout, session validation, listing, deletion, and a liveness probe.
//! * **Master Key (`keyfile::MasterKey`)**: 32 random bytes in a file next to the database, created on first run and never rotated. Seals every stored API key with AES-256-GCM.
//! * **Credential Store (`users::UserStore`)**: The users table. Passwords are Argon2id hashes; repeated failures lock an account for a fixed period.
//! * **Session Manager (`sessions::SessionStore`)**: Opaque URL-safe bearer tokens with a fixed lifetime, expired lazily on access and in bulk by the sweeper.
//! * **Attempt Ledger (`attempts::AttemptLedger`)**: One row per login attempt, keyed by source address. Recent failures feed the per-source throttle that runs before anything else.
//! * **Policy (`policy::Policy`)**: The tunable limits: lockout threshold and duration, throttle threshold and window, session lifetime, ledger retention.
//! * **Maintenance (`maintenance::Maintenance`)**: A background task sweeping expired sessions and aged ledger rows on a timer.
//!
//! Time is injected through the `clock::Clock` trait; the `testing` feature
//! exposes a steerable clock so expiry and lockout behavior can be tested
//! without waiting.

pub mod attempts;
pub mod clock;
pub mod crypto;
pub mod keyfile;
pub mod maintenance;
pub mod policy;
pub mod sessions;
pub mod store;
pub mod users;
pub mod validate;
pub mod vault;

#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use clock::{Clock, SystemClock};
pub use maintenance::Maintenance;
pub use policy::Policy;
pub use vault::{
    AuthError, AuthenticatedUser, LoginOutcome, SweepReport, Vault, VaultConfig, WeakVault,
};

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the vault.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Structured validation errors for user-supplied fields
    #[error(transparent)]
    Validation(validate::ValidationError),

    /// Structured key-file errors from the keyfile module
    #[error(transparent)]
    Keyfile(keyfile::KeyfileError),

    /// Structured cryptography errors from the crypto module
    #[error(transparent)]
    Crypto(crypto::CryptoError),

    /// Structured storage errors from the store module
    #[error(transparent)]
    Store(store::StoreError),

    /// Structured user account errors from the users module
    #[error(transparent)]
    User(users::UserError),

    /// Structured authentication errors from the vault module
    #[error(transparent)]
    Auth(vault::AuthError),

    /// Structured background task errors from the maintenance module
    #[error(transparent)]
    Maintenance(maintenance::MaintenanceError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validate",
            Error::Keyfile(_) => "keyfile",
            Error::Crypto(_) => "crypto",
            Error::Store(_) => "store",
            Error::User(_) => "users",
            Error::Auth(_) => "vault",
            Error::Maintenance(_) => "maintenance",
        }
    }

    /// Check if this error is a rejected input field.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Check if this error indicates a conflict (already exists).
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::User(user_err) => user_err.is_conflict(),
            _ => false,
        }
    }

    /// Check if this error is authentication-related.
    pub fn is_authentication_error(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    /// Check if this error is a refused login (unknown name or wrong
    /// password).
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, Error::Auth(AuthError::InvalidCredentials))
    }

    /// Check if this error is a lockout refusal.
    pub fn is_account_locked(&self) -> bool {
        matches!(self, Error::Auth(AuthError::AccountLocked))
    }

    /// Check if this error is a per-source throttle refusal.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::Auth(AuthError::RateLimited))
    }

    /// Check if this error means the presented session is not valid.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Error::Auth(AuthError::Unauthenticated))
    }

    /// Check if this error is key-material related. These are fatal at
    /// startup and never worth retrying.
    pub fn is_key_storage_error(&self) -> bool {
        matches!(self, Error::Keyfile(_))
    }

    /// Check if this error is transient storage contention worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_transient(),
            _ => false,
        }
    }
}
