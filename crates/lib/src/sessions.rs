//! Session issue, resolution, and revocation.
//!
//! A session is one row: an opaque bearer token mapped to a user id with a
//! fixed expiry. Tokens carry 256 bits from the OS generator, encoded
//! URL-safe, and are stored as issued. Expiry is enforced lazily on access
//! and in bulk by the periodic sweep; both use the same comparison, a
//! session whose expiry equals the current instant is already dead.
//!
//! Logs only ever carry a token prefix, never the full token.

use std::sync::Arc;
use std::time::Duration;

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};

use crate::Result;
use crate::clock::Clock;
use crate::store::{SqlxResultExt, Store};
use crate::users::{UserRecord, UserStore};

/// Raw token entropy in bytes before encoding.
const TOKEN_LENGTH: usize = 32;

/// How much of a token may appear in logs.
const TOKEN_PREFIX_LENGTH: usize = 8;

/// The session manager.
///
/// Owns the `sessions` table. Holds the user store only to re-read the
/// owning account on resolution, so a deleted or deactivated user is
/// reflected immediately rather than served from a stale snapshot.
#[derive(Clone)]
pub struct SessionStore {
    store: Store,
    clock: Arc<dyn Clock>,
    users: UserStore,
}

impl SessionStore {
    pub(crate) fn new(store: Store, clock: Arc<dyn Clock>, users: UserStore) -> Self {
        Self {
            store,
            clock,
            users,
        }
    }

    /// Issue a fresh session for `user_id`, valid for `ttl`.
    pub async fn issue(
        &self,
        user_id: i64,
        source_addr: &str,
        client_desc: &str,
        ttl: Duration,
    ) -> Result<String> {
        let token = generate_token();
        let now = self.clock.now_millis();
        let expires_at = now + ttl.as_millis() as i64;

        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at, source_addr, client_desc) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&token)
        .bind(user_id)
        .bind(now)
        .bind(expires_at)
        .bind(source_addr)
        .bind(client_desc)
        .execute(self.store.pool())
        .await
        .sql_context("Failed to store session")?;

        tracing::info!(
            user_id,
            token_prefix = %token_prefix(&token),
            "Session issued"
        );
        Ok(token)
    }

    /// Resolve a token to its owning user.
    ///
    /// An expired session is deleted on sight and resolves to nothing. A
    /// live one yields a fresh read of the owning account, or nothing if
    /// that account is gone or deactivated.
    pub async fn resolve(&self, token: &str) -> Result<Option<UserRecord>> {
        let now = self.clock.now_millis();

        let session: Option<(i64, i64)> =
            sqlx::query_as("SELECT user_id, expires_at FROM sessions WHERE token = $1")
                .bind(token)
                .fetch_optional(self.store.pool())
                .await
                .sql_context("Failed to look up session")?;
        let Some((user_id, expires_at)) = session else {
            return Ok(None);
        };

        if expires_at <= now {
            sqlx::query("DELETE FROM sessions WHERE token = $1")
                .bind(token)
                .execute(self.store.pool())
                .await
                .sql_context("Failed to remove expired session")?;
            tracing::debug!(
                token_prefix = %token_prefix(token),
                "Expired session removed on access"
            );
            return Ok(None);
        }

        self.users.find_by_id(user_id).await
    }

    /// Revoke a session. Revoking a token that no longer exists is fine.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(self.store.pool())
            .await
            .sql_context("Failed to revoke session")?;

        if result.rows_affected() > 0 {
            tracing::info!(token_prefix = %token_prefix(token), "Session revoked");
        }
        Ok(())
    }

    /// Delete every session whose expiry has passed. Returns how many went.
    pub async fn sweep_expired(&self) -> Result<u64> {
        let now = self.clock.now_millis();
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(self.store.pool())
            .await
            .sql_context("Failed to sweep expired sessions")?;
        Ok(result.rows_affected())
    }
}

/// 256 bits from the OS generator, URL-safe encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_LENGTH];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

/// The loggable slice of a token.
pub(crate) fn token_prefix(token: &str) -> String {
    token.chars().take(TOKEN_PREFIX_LENGTH).collect()
}
