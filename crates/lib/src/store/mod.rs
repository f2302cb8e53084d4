//! SQLite storage layer.
//!
//! One process-local database file (or an in-memory database for tests) holds
//! the three vault tables. Connections run in WAL mode with a 5 second busy
//! timeout and per-connection foreign keys, so writes serialize with a bounded
//! wait while reads proceed concurrently. Schema creation and migration live in
//! [`schema`].

mod errors;
pub use errors::StoreError;

/// Schema definition and migration system.
pub mod schema;

use std::path::Path;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};

use crate::Result;

/// Extension trait for sqlx Result types to simplify error handling.
///
/// Adds a method that converts sqlx errors into [`StoreError`] with a context
/// message, classifying lock contention and pool exhaustion as the retryable
/// [`StoreError::Busy`].
pub(crate) trait SqlxResultExt<T> {
    /// Convert a sqlx error to a StoreError with a context message.
    fn sql_context(self, context: &str) -> Result<T>;
}

impl<T> SqlxResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn sql_context(self, context: &str) -> Result<T> {
        self.map_err(|e| {
            if is_busy(&e) {
                StoreError::Busy {
                    reason: format!("{context}: {e}"),
                }
                .into()
            } else {
                StoreError::Query {
                    reason: format!("{context}: {e}"),
                    source: Some(e),
                }
                .into()
            }
        })
    }
}

/// Whether this error is lock contention or pool exhaustion hit within the
/// bounded wait, i.e. worth retrying.
fn is_busy(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|c| c.parse::<i64>().ok())
            // SQLITE_BUSY (5) and SQLITE_LOCKED (6), including extended codes
            .is_some_and(|code| matches!(code & 0xFF, 5 | 6)),
        _ => false,
    }
}

/// Whether this error is a UNIQUE constraint violation.
///
/// Registration relies on this to turn the storage-level uniqueness guard into
/// a typed conflict.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Handle to the vault's SQLite database.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the database file at `path` and initialize the schema.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            // WAL for concurrent readers, NORMAL is durable enough under WAL
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // Bounded wait on lock contention, then the operation fails Busy
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .sql_context("Failed to open store")?;

        schema::initialize(&pool).await?;

        tracing::info!(path = %path.display(), "Store opened");
        Ok(Self { pool })
    }

    /// Open an in-memory database, for tests.
    ///
    /// The pool is pinned to a single connection: an in-memory SQLite database
    /// is private to its connection, and a second one would see empty tables.
    pub async fn open_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .sql_context("Failed to open in-memory store")?;

        schema::initialize(&pool).await?;

        Ok(Self { pool })
    }

    /// The shared connection pool.
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Confirm the store accepts a trivial read.
    pub async fn liveness_probe(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    /// Close the pool, flushing outstanding connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
