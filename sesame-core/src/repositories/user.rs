//! User repository trait

use crate::{
    Error,
    user::{NewUser, User, UserId},
};
use async_trait::async_trait;

/// Repository for user account data.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Create a new user. The record should be validated before insertion.
    async fn create(&self, user: NewUser) -> Result<User, Error>;

    /// Find a user by ID
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error>;

    /// Find a user by their login name
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error>;

    /// Find a user by email address
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error>;
}
