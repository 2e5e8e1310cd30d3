//! SQLite storage backend for sesame.
//!
//! Implements the `sesame-core` repository traits on top of a
//! [`sqlx::SqlitePool`]. All timestamps are stored as unix seconds. The
//! conditional challenge and lock updates are expressed as single SQL
//! statements so that concurrent callers settle on one winner inside the
//! database.

mod migrations;
pub mod repositories;

pub use repositories::{
    SqliteAccountLockRepository, SqliteChallengeRepository, SqliteRepositoryProvider,
    SqliteUserRepository,
};

use chrono::DateTime;
use sesame_core::{OtpChallenge, User, UserId, lockout::LockState};
use sqlx::prelude::FromRow;

#[derive(Debug, Clone, FromRow)]
pub(crate) struct SqliteUser {
    id: String,
    username: String,
    email: String,
    name: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl From<SqliteUser> for User {
    fn from(user: SqliteUser) -> Self {
        User {
            id: UserId::new(&user.id),
            username: user.username,
            email: user.email,
            name: user.name,
            created_at: DateTime::from_timestamp(user.created_at, 0).unwrap_or_default(),
            updated_at: DateTime::from_timestamp(user.updated_at, 0).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct SqliteOtpChallenge {
    user_id: String,
    code: String,
    tries: i64,
    created_at: i64,
    status: i64,
}

impl From<SqliteOtpChallenge> for OtpChallenge {
    fn from(challenge: SqliteOtpChallenge) -> Self {
        OtpChallenge {
            user_id: UserId::new(&challenge.user_id),
            code: challenge.code,
            tries: challenge.tries as u32,
            created_at: DateTime::from_timestamp(challenge.created_at, 0).unwrap_or_default(),
            active: challenge.status != 0,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct SqliteLockState {
    locked: i64,
    locked_reason: Option<String>,
    locked_at: Option<i64>,
    disabled: i64,
    disabled_reason: Option<String>,
    bad_attempts: i64,
    request_count: i64,
}

impl From<SqliteLockState> for LockState {
    fn from(state: SqliteLockState) -> Self {
        LockState {
            locked: state.locked != 0,
            locked_reason: state.locked_reason,
            locked_at: state
                .locked_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            disabled: state.disabled != 0,
            disabled_reason: state.disabled_reason,
            bad_attempts: state.bad_attempts as u32,
            request_count: state.request_count as u32,
        }
    }
}
