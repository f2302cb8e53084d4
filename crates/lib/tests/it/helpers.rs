#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use portcullis::{FixedClock, LoginOutcome, Policy, Vault, VaultConfig};
use tempfile::TempDir;

/// Source address used when a test does not care about it.
pub const SOURCE: &str = "10.0.0.1";

/// Client descriptor recorded with test sessions.
pub const CLIENT: &str = "portfolio-cli/1.0";

/// Password satisfying the complexity rules.
pub const PASSWORD: &str = "CorrectHorse1";

/// A wrong password that still has a valid shape.
pub const WRONG_PASSWORD: &str = "WrongHorse99";

// ==========================
// VAULT FIXTURE
// ==========================

/// A vault on its own temporary directory with a steerable clock.
///
/// The clock starts frozen; tests move it explicitly. Dropping the fixture
/// removes the directory.
pub struct TestVault {
    pub vault: Vault,
    pub clock: Arc<FixedClock>,
    pub config: VaultConfig,
    _dir: TempDir,
}

pub async fn open_vault() -> TestVault {
    open_vault_with_policy(Policy::default()).await
}

pub async fn open_vault_with_policy(policy: Policy) -> TestVault {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = VaultConfig::in_dir(dir.path()).with_policy(policy);
    let clock = Arc::new(FixedClock::default());
    let vault = Vault::open_with_clock(config.clone(), clock.clone())
        .await
        .expect("open vault");
    TestVault {
        vault,
        clock,
        config,
        _dir: dir,
    }
}

impl TestVault {
    /// The standard API key registered for `name`.
    pub fn api_key(name: &str) -> String {
        format!("pk-{name}-key-0001")
    }

    /// Register `name` with the standard password and API key.
    pub async fn register(&self, name: &str) -> i64 {
        self.vault
            .register(name, PASSWORD, &Self::api_key(name))
            .await
            .expect("register user")
    }

    /// Log `name` in with the standard password from the standard source.
    pub async fn login(&self, name: &str) -> LoginOutcome {
        self.login_from(name, SOURCE).await.expect("login")
    }

    /// Login attempt from an explicit source, returning the raw result.
    pub async fn login_from(
        &self,
        name: &str,
        source: &str,
    ) -> portcullis::Result<LoginOutcome> {
        self.vault.login(name, PASSWORD, source, CLIENT).await
    }

    /// Login attempt with a wrong password.
    pub async fn failed_login(&self, name: &str) -> portcullis::Result<LoginOutcome> {
        self.failed_login_from(name, SOURCE).await
    }

    /// Login attempt with a wrong password from an explicit source.
    pub async fn failed_login_from(
        &self,
        name: &str,
        source: &str,
    ) -> portcullis::Result<LoginOutcome> {
        self.vault.login(name, WRONG_PASSWORD, source, CLIENT).await
    }

    /// Move the test clock forward.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Close the vault and open it again on the same directory and clock.
    pub async fn reopen(self) -> TestVault {
        let TestVault {
            vault,
            clock,
            config,
            _dir,
        } = self;
        vault.close().await;
        drop(vault);

        let vault = Vault::open_with_clock(config.clone(), clock.clone())
            .await
            .expect("reopen vault");
        TestVault {
            vault,
            clock,
            config,
            _dir,
        }
    }
}
