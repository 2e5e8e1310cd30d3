//! Account lock repository trait

use crate::{Error, lockout::LockState, user::UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository for per-account lock state and lockout counters.
///
/// Accounts with no stored state read back as [`LockState::default`].
#[async_trait]
pub trait AccountLockRepository: Send + Sync + 'static {
    /// Fetch the lock state for a user.
    async fn lock_state(&self, user_id: &UserId) -> Result<LockState, Error>;

    /// Mark the account locked at `locked_at` with an optional reason.
    async fn set_locked(
        &self,
        user_id: &UserId,
        reason: Option<&str>,
        locked_at: DateTime<Utc>,
    ) -> Result<(), Error>;

    /// Atomically release the lock, clearing the reason and timestamp.
    ///
    /// Returns `true` only for the caller that actually flipped the flag,
    /// so concurrent unlock paths settle on a single winner.
    async fn clear_lock(&self, user_id: &UserId) -> Result<bool, Error>;

    /// Mark the account disabled with an optional reason.
    async fn set_disabled(&self, user_id: &UserId, reason: Option<&str>) -> Result<(), Error>;

    /// Re-enable a disabled account. Returns whether it was disabled.
    async fn clear_disabled(&self, user_id: &UserId) -> Result<bool, Error>;

    /// Record one failed password attempt, deduplicated by `attempt_token`.
    ///
    /// A token that matches the most recently recorded one is a duplicate
    /// report of the same attempt and returns `None`. Otherwise the
    /// counter is incremented and the new value returned.
    async fn record_bad_attempt(
        &self,
        user_id: &UserId,
        attempt_token: &str,
    ) -> Result<Option<u32>, Error>;

    /// Reset the failed password attempt counter.
    async fn reset_bad_attempts(&self, user_id: &UserId) -> Result<(), Error>;

    /// Increment the one-time password request counter if it is still below
    /// `limit`, returning the new value.
    ///
    /// Returns `None` without incrementing when the counter has reached the
    /// limit; the check and the increment are a single atomic step, so
    /// concurrent callers cannot push the counter past the limit.
    async fn increment_request_count_if_below(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Option<u32>, Error>;

    /// Reset the one-time password request counter.
    async fn reset_request_count(&self, user_id: &UserId) -> Result<(), Error>;
}
