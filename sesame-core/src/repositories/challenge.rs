//! Challenge repository trait
//!
//! Each user has at most one challenge row; issuing a new code replaces the
//! previous one in place. The conditional operations (`record_failed_try`,
//! `consume_active`, `expire_if_created_at`) are the concurrency points of
//! the system: implementations must make each of them a single atomic
//! update so that concurrent verifiers and the expiry sweep cannot both
//! win on the same row.

use crate::{Error, challenge::OtpChallenge, user::UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait ChallengeRepository: Send + Sync + 'static {
    /// Insert or replace the user's challenge with a fresh code. The new
    /// row is active with zero tries.
    async fn upsert(
        &self,
        user_id: &UserId,
        code: &str,
        created_at: DateTime<Utc>,
    ) -> Result<OtpChallenge, Error>;

    /// Fetch the user's challenge row, active or not.
    async fn get(&self, user_id: &UserId) -> Result<Option<OtpChallenge>, Error>;

    /// Atomically add one failed try to the user's active challenge.
    ///
    /// Returns the new try count, or `None` when no active challenge
    /// exists (it was consumed, expired or deactivated concurrently).
    async fn record_failed_try(&self, user_id: &UserId) -> Result<Option<u32>, Error>;

    /// Reset the try counter on the user's challenge.
    async fn reset_tries(&self, user_id: &UserId) -> Result<(), Error>;

    /// Atomically flip the user's challenge from active to inactive, but
    /// only while it is active and carries exactly `code`.
    ///
    /// Returns `false` when the challenge was already consumed,
    /// deactivated, or replaced by a different code.
    async fn consume_active(&self, user_id: &UserId, code: &str) -> Result<bool, Error>;

    /// Deactivate the user's challenge, but only while its `created_at`
    /// still equals the observed value. Lets the expiry sweep lose cleanly
    /// to a concurrent re-issue.
    async fn expire_if_created_at(
        &self,
        user_id: &UserId,
        observed_created_at: DateTime<Utc>,
    ) -> Result<bool, Error>;

    /// Unconditionally deactivate the user's challenge. Returns whether an
    /// active challenge existed.
    async fn deactivate(&self, user_id: &UserId) -> Result<bool, Error>;

    /// All currently active challenges, for the expiry sweep.
    async fn list_active(&self) -> Result<Vec<OtpChallenge>, Error>;
}
