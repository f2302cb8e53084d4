//! The vault: one handle tying together key material, the credential store,
//! sessions, and the attempt ledger.
//!
//! A [`Vault`] is the crate's entry point. Opening one loads (or creates)
//! the master key, opens the database, and wires up the component stores;
//! every public operation the request layer needs lives on the handle.
//! Handles are cheap to clone and share one inner state. Background jobs
//! hold a [`WeakVault`] so they never keep a closed vault alive.
//!
//! The login path enforces two independent guards: a per-source throttle
//! fed by the attempt ledger, and a per-account lockout kept in the user
//! row. Both must pass before the password is even checked.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::attempts::AttemptLedger;
use crate::clock::{Clock, SystemClock};
use crate::crypto;
use crate::keyfile::{KeyfileError, MasterKey};
use crate::policy::Policy;
use crate::sessions::{SessionStore, token_prefix};
use crate::store::Store;
use crate::users::{UserStore, UserSummary};
use crate::validate;

mod errors;

pub use errors::AuthError;

/// Where a vault keeps its two on-disk artifacts, and the limits it
/// enforces.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VaultConfig {
    /// SQLite database holding users, sessions, and the attempt ledger
    pub db_path: PathBuf,

    /// Master key file sealing the stored credentials
    pub keyfile_path: PathBuf,

    /// Lockout, throttle, and retention limits
    pub policy: Policy,
}

impl VaultConfig {
    /// Both artifacts under one directory: `vault.db` and `vault.key`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            db_path: dir.join("vault.db"),
            keyfile_path: dir.join("vault.key"),
            policy: Policy::default(),
        }
    }

    /// Replace the default limits.
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }
}

struct VaultInner {
    store: Store,
    users: UserStore,
    sessions: SessionStore,
    attempts: AttemptLedger,
    policy: Policy,
    clock: Arc<dyn Clock>,
}

/// Handle to an open vault.
#[derive(Clone)]
pub struct Vault {
    inner: Arc<VaultInner>,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault").finish_non_exhaustive()
    }
}

/// Weak counterpart to [`Vault`], for background jobs.
#[derive(Clone)]
pub struct WeakVault {
    inner: Weak<VaultInner>,
}

impl WeakVault {
    /// Recover a full handle, unless every strong handle is gone.
    pub fn upgrade(&self) -> Option<Vault> {
        self.inner.upgrade().map(|inner| Vault { inner })
    }
}

/// What a successful login hands back to the request layer.
///
/// Holds the bearer token and the unsealed API key, so it must not be
/// persisted or logged; the `Debug` form redacts both.
#[derive(Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    pub api_key: String,
}

impl std::fmt::Debug for LoginOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = token_prefix(&self.token);
        f.debug_struct("LoginOutcome")
            .field("token", &token)
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("api_key", &"(redacted)")
            .finish()
    }
}

/// The account behind a live session.
#[derive(Clone, Serialize)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
    pub api_key: String,
}

impl std::fmt::Debug for AuthenticatedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedUser")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("api_key", &"(redacted)")
            .finish()
    }
}

/// What a maintenance sweep removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub sessions_removed: u64,
    pub attempts_purged: u64,
}

impl Vault {
    /// Open the vault described by `config`, creating the key file and
    /// database on first run.
    ///
    /// Refuses to open when the key file had to be created but the store
    /// already holds users: their credentials were sealed with a key that
    /// no longer exists, and starting anyway would quietly strand them.
    pub async fn open(config: VaultConfig) -> Result<Self> {
        Self::open_impl(config, Arc::new(SystemClock)).await
    }

    /// Open with an explicit clock, for tests that steer time.
    #[cfg(any(test, feature = "testing"))]
    pub async fn open_with_clock(config: VaultConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::open_impl(config, clock).await
    }

    async fn open_impl(config: VaultConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let (key, fresh_key) = MasterKey::load_or_create(&config.keyfile_path)?;
        let key = Arc::new(key);

        let store = Store::open(&config.db_path).await?;
        let users = UserStore::new(
            store.clone(),
            clock.clone(),
            key,
            config.policy.clone(),
        );

        if fresh_key {
            let existing = users.count().await?;
            if existing > 0 {
                store.close().await;
                return Err(KeyfileError::OrphanedCredentials {
                    path: config.keyfile_path,
                    users: existing,
                }
                .into());
            }
        }

        let sessions = SessionStore::new(store.clone(), clock.clone(), users.clone());
        let attempts = AttemptLedger::new(store.clone(), clock.clone());

        tracing::info!(db = %config.db_path.display(), "Vault opened");
        Ok(Self {
            inner: Arc::new(VaultInner {
                store,
                users,
                sessions,
                attempts,
                policy: config.policy,
                clock,
            }),
        })
    }

    /// Weak handle for background jobs.
    pub fn downgrade(&self) -> WeakVault {
        WeakVault {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Register a new account and return its id.
    ///
    /// The full input policy applies here: username shape, password
    /// complexity, API key shape. A taken username surfaces as a conflict,
    /// not a server fault.
    pub async fn register(&self, username: &str, password: &str, api_key: &str) -> Result<i64> {
        validate::username(username)?;
        validate::password(password)?;
        validate::api_key(api_key)?;
        self.inner.users.create(username, password, api_key).await
    }

    /// Authenticate and open a session.
    ///
    /// On success, returns the bearer token together with the unsealed API
    /// key for the request layer to forward. Refusals deliberately do not
    /// distinguish an unknown username from a wrong password.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        source_addr: &str,
        client_desc: &str,
    ) -> Result<LoginOutcome> {
        let inner = &self.inner;

        // Throttle on the source address before the credential store sees
        // anything, so enumeration probes cannot amplify into store traffic.
        let recent = inner
            .attempts
            .count_recent_failures(source_addr, inner.policy.throttle_window)
            .await?;
        if recent >= i64::from(inner.policy.throttle_threshold) {
            tracing::warn!(source = source_addr, recent, "Login throttled");
            return Err(AuthError::RateLimited.into());
        }

        // The attempt lands as a failure before the identity is resolved, so
        // probes against unknown names still consume a throttle slot. A
        // success appends its own row later.
        inner.attempts.record(source_addr, Some(username), false).await;

        let Some(user) = inner.users.find_by_username(username).await? else {
            tracing::debug!(source = source_addr, "Login failed, unknown username");
            return Err(AuthError::InvalidCredentials.into());
        };

        if user.is_locked_at(inner.clock.now_millis()) {
            tracing::warn!(user_id = user.id, "Login rejected, account locked");
            return Err(AuthError::AccountLocked.into());
        }

        if !crypto::verify_password(password, &user.password_hash)? {
            let state = inner.users.record_failed_attempt(user.id).await?;
            tracing::debug!(
                user_id = user.id,
                failed_attempts = state.failed_attempts,
                "Login failed, wrong password"
            );
            return Err(AuthError::InvalidCredentials.into());
        }

        inner.users.record_success(user.id).await?;
        let token = inner
            .sessions
            .issue(user.id, source_addr, client_desc, inner.policy.session_ttl)
            .await?;
        inner.attempts.record(source_addr, Some(username), true).await;
        let api_key = inner.users.unseal_api_key(&user)?;

        tracing::info!(user_id = user.id, user = %user.username, "Login succeeded");
        Ok(LoginOutcome {
            token,
            user_id: user.id,
            username: user.username,
            api_key,
        })
    }

    /// Close the session behind `token`. Succeeds whether or not the
    /// session still exists.
    pub async fn logout(&self, token: &str) -> Result<()> {
        self.inner.sessions.revoke(token).await
    }

    /// Resolve a bearer token to the account behind it.
    ///
    /// This is the per-request gate: expired, revoked, and orphaned tokens
    /// all come back as [`AuthError::Unauthenticated`].
    pub async fn validate_session(&self, token: &str) -> Result<AuthenticatedUser> {
        let Some(user) = self.inner.sessions.resolve(token).await? else {
            return Err(AuthError::Unauthenticated.into());
        };
        let api_key = self.inner.users.unseal_api_key(&user)?;
        Ok(AuthenticatedUser {
            user_id: user.id,
            username: user.username,
            api_key,
        })
    }

    /// List active accounts, ordered by username. Access control is the
    /// caller's job.
    pub async fn list_users(&self) -> Result<Vec<UserSummary>> {
        self.inner.users.list_active().await
    }

    /// Hard-delete an account and its sessions. Returns whether anything
    /// was removed.
    pub async fn delete_user(&self, username: &str) -> Result<bool> {
        self.inner.users.delete(username).await
    }

    /// Whether the store currently accepts a trivial read.
    pub async fn liveness_probe(&self) -> bool {
        self.inner.store.liveness_probe().await
    }

    /// Drop expired sessions and ledger rows past their retention.
    ///
    /// The maintenance task calls this on its timer; it is public so an
    /// operator can force a sweep.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let sessions_removed = self.inner.sessions.sweep_expired().await?;
        let cutoff =
            self.inner.clock.now_millis() - self.inner.policy.attempt_retention.as_millis() as i64;
        let attempts_purged = self.inner.attempts.purge_older_than(cutoff).await?;

        if sessions_removed > 0 || attempts_purged > 0 {
            tracing::info!(sessions_removed, attempts_purged, "Maintenance sweep completed");
        }
        Ok(SweepReport {
            sessions_removed,
            attempts_purged,
        })
    }

    /// The user store.
    pub fn users(&self) -> &UserStore {
        &self.inner.users
    }

    /// The session store.
    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    /// The attempt ledger.
    pub fn attempts(&self) -> &AttemptLedger {
        &self.inner.attempts
    }

    /// The limits this vault enforces.
    pub fn policy(&self) -> &Policy {
        &self.inner.policy
    }

    /// Close the underlying store. In-flight operations finish first.
    pub async fn close(&self) {
        self.inner.store.close().await;
    }
}
