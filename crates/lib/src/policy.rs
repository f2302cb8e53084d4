//! Tunable security limits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Security limits and lifetimes enforced by the vault.
///
/// The defaults are the deployment profile this store was built for: five wrong
/// passwords lock an account for 30 minutes, ten failures from one source
/// address within 15 minutes throttle that address, and sessions live 24 hours.
/// Hosts that need different limits construct a `Policy` and pass it through
/// [`VaultConfig`](crate::VaultConfig).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Policy {
    /// Failed logins on one account before it locks.
    pub lockout_threshold: u32,

    /// How long a locked account stays locked.
    pub lockout_duration: Duration,

    /// Failed attempts from one source address before that address is throttled.
    pub throttle_threshold: u32,

    /// Window over which source-address failures are counted.
    pub throttle_window: Duration,

    /// Session lifetime from issuance.
    pub session_ttl: Duration,

    /// Age past which attempt-ledger rows are purged.
    pub attempt_retention: Duration,

    /// Period of the background maintenance task.
    pub sweep_period: Duration,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            lockout_threshold: 5,
            lockout_duration: Duration::from_secs(30 * 60),
            throttle_threshold: 10,
            throttle_window: Duration::from_secs(15 * 60),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            attempt_retention: Duration::from_secs(24 * 60 * 60),
            sweep_period: Duration::from_secs(60 * 60),
        }
    }
}
