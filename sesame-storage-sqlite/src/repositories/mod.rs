//! Repository implementations for SQLite storage

pub mod account;
pub mod challenge;
pub mod user;

pub use account::SqliteAccountLockRepository;
pub use challenge::SqliteChallengeRepository;
pub use user::SqliteUserRepository;

use async_trait::async_trait;
use sesame_core::{
    Error,
    error::StorageError,
    repositories::{
        AccountLockRepositoryProvider, ChallengeRepositoryProvider, RepositoryProvider,
        UserRepositoryProvider,
    },
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Repository provider implementation for SQLite
///
/// This struct implements all the individual repository provider traits
/// as well as the unified `RepositoryProvider` trait.
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    user: Arc<SqliteUserRepository>,
    challenge: Arc<SqliteChallengeRepository>,
    account_lock: Arc<SqliteAccountLockRepository>,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        let user = Arc::new(SqliteUserRepository::new(pool.clone()));
        let challenge = Arc::new(SqliteChallengeRepository::new(pool.clone()));
        let account_lock = Arc::new(SqliteAccountLockRepository::new(pool.clone()));

        Self {
            pool,
            user,
            challenge,
            account_lock,
        }
    }

    /// Connect to a SQLite database and build a provider for it.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let pool = SqlitePool::connect(url)
            .await
            .map_err(|e| Error::Storage(StorageError::Connection(e.to_string())))?;
        Ok(Self::new(pool))
    }
}

impl UserRepositoryProvider for SqliteRepositoryProvider {
    type UserRepo = SqliteUserRepository;

    fn user(&self) -> &Self::UserRepo {
        &self.user
    }
}

impl ChallengeRepositoryProvider for SqliteRepositoryProvider {
    type ChallengeRepo = SqliteChallengeRepository;

    fn challenge(&self) -> &Self::ChallengeRepo {
        &self.challenge
    }
}

impl AccountLockRepositoryProvider for SqliteRepositoryProvider {
    type AccountLockRepo = SqliteAccountLockRepository;

    fn account_lock(&self) -> &Self::AccountLockRepo {
        &self.account_lock
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        crate::migrations::migrate(&self.pool).await
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;
        Ok(())
    }
}
