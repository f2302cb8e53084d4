//! SQL schema definitions and migrations.
//!
//! # Migration System
//!
//! Migrations are code-based functions rather than SQL files. To add one:
//!
//! 1. Increment `SCHEMA_VERSION`
//! 2. Add a `migrate_vN_to_vM` async function
//! 3. Add it to the match statement in `run_migration`

use sqlx::SqlitePool;

use super::SqlxResultExt;
use crate::Result;
use crate::store::errors::StoreError;

/// Current schema version.
///
/// Increment this when making schema changes that require migration.
pub const SCHEMA_VERSION: i64 = 1;

/// SQL statements to create the schema tables.
///
/// All timestamps are milliseconds since the Unix epoch (BIGINT).
pub const CREATE_TABLES: &[&str] = &[
    // Schema version tracking
    "CREATE TABLE IF NOT EXISTS schema_version (
        version BIGINT PRIMARY KEY
    )",
    // Credential store. The UNIQUE constraint on username is the race-safe
    // registration guard; sealed credentials are AES-256-GCM blobs.
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        api_key_sealed BLOB NOT NULL,
        created_at BIGINT NOT NULL,
        last_login BIGINT,
        failed_login_attempts BIGINT NOT NULL DEFAULT 0,
        locked_until BIGINT,
        is_active BIGINT NOT NULL DEFAULT 1
    )",
    // Sessions. Deleting a user removes their sessions through the FK.
    "CREATE TABLE IF NOT EXISTS sessions (
        token TEXT PRIMARY KEY NOT NULL,
        user_id INTEGER NOT NULL,
        created_at BIGINT NOT NULL,
        expires_at BIGINT NOT NULL,
        source_addr TEXT NOT NULL,
        client_desc TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
    )",
    // Append-only attempt ledger for throttling and audit.
    "CREATE TABLE IF NOT EXISTS login_attempts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source_addr TEXT NOT NULL,
        username TEXT,
        success BIGINT NOT NULL DEFAULT 0,
        attempted_at BIGINT NOT NULL
    )",
];

/// SQL statements to create indexes.
pub const CREATE_INDEXES: &[&str] = &[
    // Session sweep and per-user cascade lookups
    "CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)",
    // Throttle window counting and retention purge
    "CREATE INDEX IF NOT EXISTS idx_login_attempts_source ON login_attempts(source_addr, attempted_at)",
    "CREATE INDEX IF NOT EXISTS idx_login_attempts_attempted_at ON login_attempts(attempted_at)",
];

/// Initialize the database schema.
///
/// Creates tables and indexes if they don't exist, and handles migrations
/// if the schema version has changed.
pub async fn initialize(pool: &SqlitePool) -> Result<()> {
    for statement in CREATE_TABLES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| StoreError::Query {
                reason: format!("Schema creation failed: {e} - SQL: {statement}"),
                source: Some(e),
            })?;
    }

    let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM schema_version")
        .fetch_optional(pool)
        .await
        .sql_context("Failed to check schema version")?;

    match row {
        None => {
            sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
                .bind(SCHEMA_VERSION)
                .execute(pool)
                .await
                .sql_context("Failed to initialize schema version")?;
        }
        Some((current,)) if current < SCHEMA_VERSION => {
            migrate(pool, current, SCHEMA_VERSION).await?;
        }
        Some((current,)) if current > SCHEMA_VERSION => {
            return Err(StoreError::Migration {
                reason: format!(
                    "Store was written by a newer version (schema v{current}, supported v{SCHEMA_VERSION})"
                ),
            }
            .into());
        }
        Some(_) => {}
    }

    for statement in CREATE_INDEXES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| StoreError::Query {
                reason: format!("Index creation failed: {e} - SQL: {statement}"),
                source: Some(e),
            })?;
    }

    Ok(())
}

/// Run migrations sequentially from one schema version to another.
async fn migrate(pool: &SqlitePool, from: i64, to: i64) -> Result<()> {
    tracing::info!(from, to, "Starting schema migration");

    let mut current = from;
    while current < to {
        let next = current + 1;
        run_migration(pool, current, next).await?;

        sqlx::query("UPDATE schema_version SET version = $1")
            .bind(next)
            .execute(pool)
            .await
            .sql_context("Failed to update schema version")?;

        tracing::info!(version = next, "Migration completed");
        current = next;
    }

    Ok(())
}

/// Execute a single migration step.
///
/// When incrementing `SCHEMA_VERSION`, add a match arm here:
///
/// ```ignore
/// match from {
///     1 => migrate_v1_to_v2(pool).await,
///     _ => { /* unknown path */ }
/// }
/// ```
async fn run_migration(pool: &SqlitePool, from: i64, to: i64) -> Result<()> {
    // No migrations exist yet; any attempt to migrate is an error.
    let _ = pool;

    Err(StoreError::Migration {
        reason: format!(
            "Unknown migration path: v{from} to v{to}. \
             This likely means SCHEMA_VERSION was incremented without adding a migration."
        ),
    }
    .into())
}
