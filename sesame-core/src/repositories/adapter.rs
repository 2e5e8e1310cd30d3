use crate::{
    Error,
    challenge::OtpChallenge,
    lockout::LockState,
    repositories::{
        AccountLockRepository, ChallengeRepository, RepositoryProvider, UserRepository,
    },
    user::{NewUser, User, UserId},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Adapter that wraps a RepositoryProvider and implements individual repository traits
pub struct UserRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> UserRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> UserRepository for UserRepositoryAdapter<R> {
    async fn create(&self, user: NewUser) -> Result<User, Error> {
        self.provider.user().create(user).await
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
        self.provider.user().find_by_id(id).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        self.provider.user().find_by_username(username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.provider.user().find_by_email(email).await
    }
}

pub struct ChallengeRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> ChallengeRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> ChallengeRepository for ChallengeRepositoryAdapter<R> {
    async fn upsert(
        &self,
        user_id: &UserId,
        code: &str,
        created_at: DateTime<Utc>,
    ) -> Result<OtpChallenge, Error> {
        self.provider
            .challenge()
            .upsert(user_id, code, created_at)
            .await
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<OtpChallenge>, Error> {
        self.provider.challenge().get(user_id).await
    }

    async fn record_failed_try(&self, user_id: &UserId) -> Result<Option<u32>, Error> {
        self.provider.challenge().record_failed_try(user_id).await
    }

    async fn reset_tries(&self, user_id: &UserId) -> Result<(), Error> {
        self.provider.challenge().reset_tries(user_id).await
    }

    async fn consume_active(&self, user_id: &UserId, code: &str) -> Result<bool, Error> {
        self.provider.challenge().consume_active(user_id, code).await
    }

    async fn expire_if_created_at(
        &self,
        user_id: &UserId,
        observed_created_at: DateTime<Utc>,
    ) -> Result<bool, Error> {
        self.provider
            .challenge()
            .expire_if_created_at(user_id, observed_created_at)
            .await
    }

    async fn deactivate(&self, user_id: &UserId) -> Result<bool, Error> {
        self.provider.challenge().deactivate(user_id).await
    }

    async fn list_active(&self) -> Result<Vec<OtpChallenge>, Error> {
        self.provider.challenge().list_active().await
    }
}

pub struct AccountLockRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> AccountLockRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> AccountLockRepository for AccountLockRepositoryAdapter<R> {
    async fn lock_state(&self, user_id: &UserId) -> Result<LockState, Error> {
        self.provider.account_lock().lock_state(user_id).await
    }

    async fn set_locked(
        &self,
        user_id: &UserId,
        reason: Option<&str>,
        locked_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        self.provider
            .account_lock()
            .set_locked(user_id, reason, locked_at)
            .await
    }

    async fn clear_lock(&self, user_id: &UserId) -> Result<bool, Error> {
        self.provider.account_lock().clear_lock(user_id).await
    }

    async fn set_disabled(&self, user_id: &UserId, reason: Option<&str>) -> Result<(), Error> {
        self.provider
            .account_lock()
            .set_disabled(user_id, reason)
            .await
    }

    async fn clear_disabled(&self, user_id: &UserId) -> Result<bool, Error> {
        self.provider.account_lock().clear_disabled(user_id).await
    }

    async fn record_bad_attempt(
        &self,
        user_id: &UserId,
        attempt_token: &str,
    ) -> Result<Option<u32>, Error> {
        self.provider
            .account_lock()
            .record_bad_attempt(user_id, attempt_token)
            .await
    }

    async fn reset_bad_attempts(&self, user_id: &UserId) -> Result<(), Error> {
        self.provider.account_lock().reset_bad_attempts(user_id).await
    }

    async fn increment_request_count_if_below(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Option<u32>, Error> {
        self.provider
            .account_lock()
            .increment_request_count_if_below(user_id, limit)
            .await
    }

    async fn reset_request_count(&self, user_id: &UserId) -> Result<(), Error> {
        self.provider
            .account_lock()
            .reset_request_count(user_id)
            .await
    }
}
