//! Login attempt ledger.
//!
//! Every login attempt, successful or not, leaves a row keyed by source
//! address. The throttle counts recent failures per source; a periodic purge
//! keeps the table from growing without bound. Rows outlive the accounts
//! they mention: the ledger records what happened, not who exists.

use std::sync::Arc;
use std::time::Duration;

use crate::Result;
use crate::clock::Clock;
use crate::store::{SqlxResultExt, Store};

/// Append-only record of login attempts, one row per attempt.
#[derive(Clone)]
pub struct AttemptLedger {
    store: Store,
    clock: Arc<dyn Clock>,
}

impl AttemptLedger {
    pub(crate) fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Append one attempt row.
    ///
    /// Never fails the caller: a storage error here is logged and swallowed,
    /// since refusing a login because its audit row could not be written
    /// would turn bookkeeping into an outage. Once this returns without
    /// logging an error the row is committed.
    pub async fn record(&self, source_addr: &str, username: Option<&str>, success: bool) {
        let now = self.clock.now_millis();
        let result = sqlx::query(
            "INSERT INTO login_attempts (source_addr, username, success, attempted_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(source_addr)
        .bind(username)
        .bind(i64::from(success))
        .bind(now)
        .execute(self.store.pool())
        .await;

        if let Err(e) = result {
            tracing::warn!(source = source_addr, error = %e, "Failed to record login attempt");
        }
    }

    /// Count failed attempts from `source_addr` within the trailing `window`.
    pub async fn count_recent_failures(&self, source_addr: &str, window: Duration) -> Result<i64> {
        let cutoff = self.clock.now_millis() - window.as_millis() as i64;
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM login_attempts \
             WHERE source_addr = $1 AND success = 0 AND attempted_at > $2",
        )
        .bind(source_addr)
        .bind(cutoff)
        .fetch_one(self.store.pool())
        .await
        .sql_context("Failed to count recent failures")
    }

    /// Delete ledger rows older than `cutoff_millis`. Returns how many went.
    pub async fn purge_older_than(&self, cutoff_millis: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM login_attempts WHERE attempted_at < $1")
            .bind(cutoff_millis)
            .execute(self.store.pool())
            .await
            .sql_context("Failed to purge login attempts")?;
        Ok(result.rows_affected())
    }
}
