//! Core data types for the credential store

use serde::{Deserialize, Serialize};

/// A user row as stored, including authentication state.
///
/// Carries the password hash and the sealed credential, so it stays inside the
/// crate; the listing type handed to callers is [`UserSummary`].
#[derive(Clone, Debug)]
pub struct UserRecord {
    /// Storage-assigned id
    pub id: i64,

    /// Unique login identifier
    pub username: String,

    /// Argon2id hash (PHC format, salt embedded)
    pub password_hash: String,

    /// AES-256-GCM sealed secondary credential (nonce || ciphertext)
    pub api_key_sealed: Vec<u8>,

    /// Account creation time (unix millis)
    pub created_at: i64,

    /// Last successful login (unix millis)
    pub last_login: Option<i64>,

    /// Consecutive failed logins since the last success
    pub failed_login_attempts: i64,

    /// Lockout expiry (unix millis); the account is locked while this is in
    /// the future
    pub locked_until: Option<i64>,
}

impl UserRecord {
    /// Whether the account is locked at the given instant.
    pub fn is_locked_at(&self, now_millis: i64) -> bool {
        self.locked_until.is_some_and(|until| until > now_millis)
    }
}

/// Public listing row: no hash, no credential.
///
/// Timestamps are milliseconds since the Unix epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub created_at: i64,
    pub last_login: Option<i64>,
}

/// Lockout state after recording a failed login.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockoutState {
    /// Counter value after this failure
    pub failed_attempts: i64,

    /// Set when this failure tripped (or extended) the lockout
    pub locked_until: Option<i64>,
}

impl LockoutState {
    /// Whether this failure left the account locked.
    pub fn is_locked(&self) -> bool {
        self.locked_until.is_some()
    }
}
