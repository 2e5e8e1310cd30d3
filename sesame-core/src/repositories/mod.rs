//! Repository traits for the data access layer
//!
//! Services talk to storage exclusively through these traits:
//!
//! - Individual `*Repository` traits define the operations for each data domain
//! - Individual `*RepositoryProvider` traits provide access to each repository type
//! - [`RepositoryProvider`] is a supertrait combining all provider traits plus
//!   lifecycle methods
//!
//! Storage backends implement the repository traits once and expose them
//! through a provider; the adapters in [`adapter`] then hand each service a
//! standalone handle to its repository.

pub mod account;
pub mod adapter;
pub mod challenge;
pub mod user;

pub use account::AccountLockRepository;
pub use adapter::{
    AccountLockRepositoryAdapter, ChallengeRepositoryAdapter, UserRepositoryAdapter,
};
pub use challenge::ChallengeRepository;
pub use user::UserRepository;

use async_trait::async_trait;

use crate::Error;

/// Provider trait for user repository access.
pub trait UserRepositoryProvider: Send + Sync + 'static {
    /// The user repository implementation type
    type UserRepo: UserRepository;

    /// Get the user repository
    fn user(&self) -> &Self::UserRepo;
}

/// Provider trait for challenge repository access.
pub trait ChallengeRepositoryProvider: Send + Sync + 'static {
    /// The challenge repository implementation type
    type ChallengeRepo: ChallengeRepository;

    /// Get the challenge repository
    fn challenge(&self) -> &Self::ChallengeRepo;
}

/// Provider trait for account lock repository access.
pub trait AccountLockRepositoryProvider: Send + Sync + 'static {
    /// The account lock repository implementation type
    type AccountLockRepo: AccountLockRepository;

    /// Get the account lock repository
    fn account_lock(&self) -> &Self::AccountLockRepo;
}

/// Provider trait that storage implementations must implement to provide all
/// repositories, plus lifecycle methods for migrations and health checks.
#[async_trait]
pub trait RepositoryProvider:
    UserRepositoryProvider + ChallengeRepositoryProvider + AccountLockRepositoryProvider
{
    /// Run migrations for all repositories
    async fn migrate(&self) -> Result<(), Error>;

    /// Health check for all repositories
    async fn health_check(&self) -> Result<(), Error>;
}
