//! Account lockout service.
//!
//! Drives the account lock state machine: placing and releasing locks,
//! disabling accounts, and counting failed password attempts. Every lock
//! schedules its own release through the [`Scheduler`]; the deferred job
//! re-validates the lock when it fires, so a stale or duplicate firing is
//! harmless.

use std::sync::Arc;

use crate::{
    Error,
    clock::Clock,
    config::OtpConfig,
    lockout::LockState,
    outcome::Denial,
    repositories::{AccountLockRepository, ChallengeRepository},
    scheduler::{ScheduledJob, Scheduler},
    user::UserId,
};

/// Result of reporting a failed password attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordAttempt {
    /// Not counted: duplicate report, or the account is already locked or
    /// disabled.
    Ignored,
    /// Counted, account still open.
    Counted { attempts: u32 },
    /// The attempt pushed the account over the limit and locked it.
    Locked,
}

pub struct LockoutService<A, C> {
    accounts: Arc<A>,
    challenges: Arc<C>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    config: OtpConfig,
}

impl<A, C> Clone for LockoutService<A, C> {
    fn clone(&self) -> Self {
        Self {
            accounts: self.accounts.clone(),
            challenges: self.challenges.clone(),
            clock: self.clock.clone(),
            scheduler: self.scheduler.clone(),
            config: self.config.clone(),
        }
    }
}

impl<A, C> LockoutService<A, C>
where
    A: AccountLockRepository,
    C: ChallengeRepository,
{
    pub fn new(
        accounts: Arc<A>,
        challenges: Arc<C>,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        config: OtpConfig,
    ) -> Self {
        Self {
            accounts,
            challenges,
            clock,
            scheduler,
            config,
        }
    }

    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    fn unlock_key(user_id: &UserId) -> String {
        format!("unlock:{user_id}")
    }

    pub async fn lock_state(&self, user_id: &UserId) -> Result<LockState, Error> {
        self.accounts.lock_state(user_id).await
    }

    pub async fn is_locked(&self, user_id: &UserId) -> Result<bool, Error> {
        Ok(self.lock_state(user_id).await?.locked)
    }

    pub async fn is_disabled(&self, user_id: &UserId) -> Result<bool, Error> {
        Ok(self.lock_state(user_id).await?.disabled)
    }

    /// The denial a locked account produces, honoring `show_lock_reason`.
    pub fn locked_denial(&self, state: &LockState) -> Denial {
        Denial::AccountLocked {
            reason: self.displayed_reason(
                state.locked_reason.as_deref(),
                &self.config.default_locked_reason,
            ),
        }
    }

    /// The denial a disabled account produces, honoring `show_lock_reason`.
    pub fn disabled_denial(&self, state: &LockState) -> Denial {
        Denial::AccountDisabled {
            reason: self.displayed_reason(
                state.disabled_reason.as_deref(),
                &self.config.default_disabled_reason,
            ),
        }
    }

    fn displayed_reason(&self, stored: Option<&str>, default: &str) -> Option<String> {
        if !self.config.show_lock_reason {
            return None;
        }
        Some(stored.unwrap_or(default).to_string())
    }

    /// The denial that currently gates this account, if any. Disabled wins
    /// over locked.
    pub async fn gate(&self, user_id: &UserId) -> Result<Option<Denial>, Error> {
        let state = self.lock_state(user_id).await?;
        if state.disabled {
            return Ok(Some(self.disabled_denial(&state)));
        }
        if state.locked {
            return Ok(Some(self.locked_denial(&state)));
        }
        Ok(None)
    }

    /// Lock the account and schedule its release after the block time.
    ///
    /// The user's pending challenge is deactivated so the code cannot be
    /// used once the lock releases. If the release cannot be scheduled the
    /// lock stands until released through some other path.
    pub async fn lock(&self, user_id: &UserId, reason: Option<&str>) -> Result<(), Error> {
        let reason = reason.unwrap_or(&self.config.default_locked_reason);
        let now = self.clock.now();

        self.accounts.set_locked(user_id, Some(reason), now).await?;
        self.challenges.deactivate(user_id).await?;

        tracing::info!(user_id = %user_id, reason = reason, "Account locked");

        let delay = self.config.block_time.to_std().unwrap_or_default();
        let service = self.clone();
        let deferred_user = user_id.clone();
        let job: ScheduledJob = Box::pin(async move {
            if let Err(e) = service.release_if_due(&deferred_user).await {
                tracing::warn!(error = %e, user_id = %deferred_user, "Deferred unlock failed");
            }
        });

        if let Err(e) = self
            .scheduler
            .schedule_once(&Self::unlock_key(user_id), delay, job)
        {
            tracing::error!(
                error = %e,
                user_id = %user_id,
                "Could not schedule the deferred unlock; the account stays locked until released manually"
            );
        }

        Ok(())
    }

    /// Release the lock if its block time has run out.
    ///
    /// This is what the deferred job runs. It re-reads the lock state, so
    /// firing for a lock that was already released, or that was re-placed
    /// later, never releases an account early.
    pub async fn release_if_due(&self, user_id: &UserId) -> Result<bool, Error> {
        let state = self.lock_state(user_id).await?;
        if !state.locked {
            return Ok(false);
        }
        if !state.is_lock_elapsed(self.clock.now(), self.config.block_time) {
            tracing::debug!(user_id = %user_id, "Lock has not run out yet; leaving it in place");
            return Ok(false);
        }
        self.unlock(user_id).await
    }

    /// Release the lock immediately and reset the lockout counters.
    ///
    /// Returns `true` for the caller that actually released the lock;
    /// concurrent unlock paths settle on a single winner and the counters
    /// are reset exactly once.
    pub async fn unlock(&self, user_id: &UserId) -> Result<bool, Error> {
        let released = self.accounts.clear_lock(user_id).await?;
        if released {
            self.accounts.reset_bad_attempts(user_id).await?;
            self.accounts.reset_request_count(user_id).await?;
            self.challenges.reset_tries(user_id).await?;
            // Cancel after the state updates: when this runs inside the
            // deferred job itself, an earlier abort would cut them short.
            self.scheduler.cancel(&Self::unlock_key(user_id));
            tracing::info!(user_id = %user_id, "Account unlocked");
        }
        Ok(released)
    }

    /// Disable the account indefinitely. Only [`Self::enable`] reverses it.
    pub async fn disable(&self, user_id: &UserId, reason: Option<&str>) -> Result<(), Error> {
        let reason = reason.unwrap_or(&self.config.default_disabled_reason);
        self.accounts.set_disabled(user_id, Some(reason)).await?;
        self.challenges.deactivate(user_id).await?;
        tracing::info!(user_id = %user_id, reason = reason, "Account disabled");
        Ok(())
    }

    pub async fn enable(&self, user_id: &UserId) -> Result<bool, Error> {
        let enabled = self.accounts.clear_disabled(user_id).await?;
        if enabled {
            tracing::info!(user_id = %user_id, "Account re-enabled");
        }
        Ok(enabled)
    }

    /// Count one failed password attempt, locking the account when it
    /// reaches the limit.
    ///
    /// `attempt_token` identifies the attempt; reporting the same token
    /// twice counts once. Attempts against locked or disabled accounts are
    /// not counted.
    pub async fn record_failed_password(
        &self,
        user_id: &UserId,
        attempt_token: &str,
    ) -> Result<PasswordAttempt, Error> {
        let state = self.lock_state(user_id).await?;
        if state.disabled || state.locked {
            return Ok(PasswordAttempt::Ignored);
        }

        let Some(attempts) = self
            .accounts
            .record_bad_attempt(user_id, attempt_token)
            .await?
        else {
            tracing::debug!(user_id = %user_id, "Duplicate failed-password report ignored");
            return Ok(PasswordAttempt::Ignored);
        };

        if attempts >= self.config.max_failed_password_attempts {
            self.lock(user_id, None).await?;
            return Ok(PasswordAttempt::Locked);
        }

        Ok(PasswordAttempt::Counted { attempts })
    }

    /// Called after a fully completed login. Releases any lock and clears
    /// the failed-password counter.
    pub async fn record_successful_login(&self, user_id: &UserId) -> Result<(), Error> {
        self.unlock(user_id).await?;
        self.accounts.reset_bad_attempts(user_id).await?;
        Ok(())
    }

    pub async fn reset_bad_attempts(&self, user_id: &UserId) -> Result<(), Error> {
        self.accounts.reset_bad_attempts(user_id).await
    }

    /// Count one issued one-time password against the request quota.
    ///
    /// Returns the new total, or `None` when the quota is already spent.
    /// The repository checks and increments in one step, so concurrent
    /// issuers cannot overshoot the quota.
    pub async fn note_request(&self, user_id: &UserId) -> Result<Option<u32>, Error> {
        self.accounts
            .increment_request_count_if_below(user_id, self.config.max_otp_requests)
            .await
    }
}
