//! Schema setup.
//!
//! The schema is created idempotently on startup; every statement is safe
//! to re-run against an existing database.

use sesame_core::{Error, error::StorageError};
use sqlx::SqlitePool;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        name TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS otp_challenges (
        user_id TEXT PRIMARY KEY,
        code TEXT NOT NULL,
        tries INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        status INTEGER NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS account_locks (
        user_id TEXT PRIMARY KEY,
        locked INTEGER NOT NULL DEFAULT 0,
        locked_reason TEXT,
        locked_at INTEGER,
        disabled INTEGER NOT NULL DEFAULT 0,
        disabled_reason TEXT,
        bad_attempts INTEGER NOT NULL DEFAULT 0,
        request_count INTEGER NOT NULL DEFAULT 0,
        last_attempt_token TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_otp_challenges_status ON otp_challenges(status)",
    "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)",
    "CREATE INDEX IF NOT EXISTS idx_users_username ON users(username)",
];

pub(crate) async fn migrate(pool: &SqlitePool) -> Result<(), Error> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| Error::Storage(StorageError::Migration(e.to_string())))?;
    }
    tracing::debug!("SQLite schema is up to date");
    Ok(())
}
