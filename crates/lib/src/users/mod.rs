//! User account management.
//!
//! The credential store owns the `users` table: account creation, lookup,
//! lockout bookkeeping, and deletion. Passwords are stored as Argon2id
//! hashes; the secondary API credential is sealed with the master key and
//! only unsealed on successful authentication.
//!
//! Lockout is driven by two columns, `failed_login_attempts` and
//! `locked_until`. A failure increments the counter; reaching the threshold
//! stamps an expiry. A success resets both. Nothing else interprets them.

use std::sync::Arc;

use crate::Result;
use crate::clock::Clock;
use crate::crypto;
use crate::keyfile::MasterKey;
use crate::policy::Policy;
use crate::store::{SqlxResultExt, Store, is_unique_violation};
use crate::validate;

mod errors;
mod types;

pub use errors::UserError;
pub use types::{LockoutState, UserRecord, UserSummary};

/// Row shape shared by the single-user lookups.
type UserRow = (
    i64,
    String,
    String,
    Vec<u8>,
    i64,
    Option<i64>,
    i64,
    Option<i64>,
);

fn record_from_row(row: UserRow) -> UserRecord {
    let (
        id,
        username,
        password_hash,
        api_key_sealed,
        created_at,
        last_login,
        failed_login_attempts,
        locked_until,
    ) = row;
    UserRecord {
        id,
        username,
        password_hash,
        api_key_sealed,
        created_at,
        last_login,
        failed_login_attempts,
        locked_until,
    }
}

/// The credential store.
///
/// Cheap to clone; all clones share the same pool, clock, and key.
#[derive(Clone)]
pub struct UserStore {
    store: Store,
    clock: Arc<dyn Clock>,
    key: Arc<MasterKey>,
    policy: Policy,
}

impl UserStore {
    pub(crate) fn new(
        store: Store,
        clock: Arc<dyn Clock>,
        key: Arc<MasterKey>,
        policy: Policy,
    ) -> Self {
        Self {
            store,
            clock,
            key,
            policy,
        }
    }

    /// Create a new account and return its id.
    ///
    /// Hashes the password, seals the API key, and inserts the row. The
    /// shape checks are applied again here so no caller can bypass them;
    /// uniqueness is enforced by the storage constraint, so concurrent
    /// registrations of the same name leave exactly one row.
    pub async fn create(&self, username: &str, password: &str, api_key: &str) -> Result<i64> {
        validate::username(username)?;
        validate::password_min_length(password)?;
        validate::api_key(api_key)?;

        let password_hash = crypto::hash_password(password)?;
        let sealed = crypto::seal_credential(api_key, self.key.as_bytes())?;
        let now = self.clock.now_millis();

        let mut tx = self
            .store
            .pool()
            .begin()
            .await
            .sql_context("Failed to begin user creation")?;

        let inserted = match sqlx::query(
            "INSERT INTO users (username, password_hash, api_key_sealed, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(username)
        .bind(&password_hash)
        .bind(&sealed)
        .bind(now)
        .execute(&mut *tx)
        .await
        {
            Ok(result) => result,
            Err(e) if is_unique_violation(&e) => {
                return Err(UserError::UsernameTaken {
                    username: username.to_string(),
                }
                .into());
            }
            Err(e) => Err(e).sql_context("Failed to insert user account")?,
        };
        let id = inserted.last_insert_rowid();

        tx.commit()
            .await
            .sql_context("Failed to commit user creation")?;

        tracing::info!(user = username, user_id = id, "User account created");
        Ok(id)
    }

    /// Look up an active account by username.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password_hash, api_key_sealed, created_at, last_login, \
             failed_login_attempts, locked_until \
             FROM users WHERE username = $1 AND is_active = 1",
        )
        .bind(username)
        .fetch_optional(self.store.pool())
        .await
        .sql_context("Failed to look up user by name")?;
        Ok(row.map(record_from_row))
    }

    /// Look up an active account by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password_hash, api_key_sealed, created_at, last_login, \
             failed_login_attempts, locked_until \
             FROM users WHERE id = $1 AND is_active = 1",
        )
        .bind(id)
        .fetch_optional(self.store.pool())
        .await
        .sql_context("Failed to look up user by id")?;
        Ok(row.map(record_from_row))
    }

    /// Record a failed login for this account.
    ///
    /// Increments the failure counter; at the threshold, stamps a lockout
    /// expiry. Below it, any stale expiry is cleared so an old lockout
    /// cannot outlive a reset counter. Returns the resulting state so the
    /// caller can log the transition.
    pub async fn record_failed_attempt(&self, id: i64) -> Result<LockoutState> {
        let now = self.clock.now_millis();

        let mut tx = self
            .store
            .pool()
            .begin()
            .await
            .sql_context("Failed to begin lockout update")?;

        let row: Option<(i64,)> =
            sqlx::query_as("SELECT failed_login_attempts FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .sql_context("Failed to read failure counter")?;
        let Some((current,)) = row else {
            // The account vanished mid-login; nothing to lock.
            return Ok(LockoutState {
                failed_attempts: 0,
                locked_until: None,
            });
        };

        let failed_attempts = current + 1;
        let locked_until = (failed_attempts >= i64::from(self.policy.lockout_threshold))
            .then(|| now + self.policy.lockout_duration.as_millis() as i64);

        sqlx::query("UPDATE users SET failed_login_attempts = $1, locked_until = $2 WHERE id = $3")
            .bind(failed_attempts)
            .bind(locked_until)
            .bind(id)
            .execute(&mut *tx)
            .await
            .sql_context("Failed to update failure counter")?;

        tx.commit()
            .await
            .sql_context("Failed to commit lockout update")?;

        if locked_until.is_some() {
            tracing::warn!(
                user_id = id,
                failed_attempts,
                "Account locked after repeated failures"
            );
        }
        Ok(LockoutState {
            failed_attempts,
            locked_until,
        })
    }

    /// Record a successful login: reset the failure counter and lockout,
    /// stamp the last-login time.
    pub async fn record_success(&self, id: i64) -> Result<()> {
        let now = self.clock.now_millis();

        let mut tx = self
            .store
            .pool()
            .begin()
            .await
            .sql_context("Failed to begin login bookkeeping")?;

        sqlx::query(
            "UPDATE users SET last_login = $1, failed_login_attempts = 0, locked_until = NULL \
             WHERE id = $2",
        )
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await
        .sql_context("Failed to record successful login")?;

        tx.commit()
            .await
            .sql_context("Failed to commit login bookkeeping")?;
        Ok(())
    }

    /// Delete an account by username.
    ///
    /// Sessions referencing the account go with it (cascading delete).
    /// Ledger rows stay; they record what happened, not who exists.
    /// Returns whether a row was removed.
    pub async fn delete(&self, username: &str) -> Result<bool> {
        let mut tx = self
            .store
            .pool()
            .begin()
            .await
            .sql_context("Failed to begin user deletion")?;

        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&mut *tx)
            .await
            .sql_context("Failed to delete user")?;

        tx.commit()
            .await
            .sql_context("Failed to commit user deletion")?;

        let removed = result.rows_affected() > 0;
        if removed {
            tracing::info!(user = username, "User account deleted");
        }
        Ok(removed)
    }

    /// List active accounts ordered by username.
    pub async fn list_active(&self) -> Result<Vec<UserSummary>> {
        let rows: Vec<(String, i64, Option<i64>)> = sqlx::query_as(
            "SELECT username, created_at, last_login FROM users \
             WHERE is_active = 1 ORDER BY username",
        )
        .fetch_all(self.store.pool())
        .await
        .sql_context("Failed to list users")?;

        Ok(rows
            .into_iter()
            .map(|(username, created_at, last_login)| UserSummary {
                username,
                created_at,
                last_login,
            })
            .collect())
    }

    /// Total number of accounts, active or not.
    pub(crate) async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.store.pool())
            .await
            .sql_context("Failed to count users")
    }

    /// Decrypt the sealed API key of a loaded record.
    pub fn unseal_api_key(&self, record: &UserRecord) -> Result<String> {
        crypto::open_credential(&record.api_key_sealed, self.key.as_bytes())
    }
}
