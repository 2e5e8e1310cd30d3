//! One-time password ledger service.
//!
//! Issues codes, answers questions about the pending challenge, and runs
//! the background sweep that deactivates codes whose validity window has
//! elapsed. Locked accounts are skipped by the sweep; their challenge is
//! frozen until the unlock path resets it.

use std::sync::Arc;

use crate::{
    Error,
    challenge::{OtpChallenge, generate_code},
    clock::Clock,
    config::OtpConfig,
    repositories::{AccountLockRepository, ChallengeRepository},
    user::UserId,
};

pub struct ChallengeService<C, A> {
    challenges: Arc<C>,
    accounts: Arc<A>,
    clock: Arc<dyn Clock>,
    config: OtpConfig,
}

impl<C, A> Clone for ChallengeService<C, A> {
    fn clone(&self) -> Self {
        Self {
            challenges: self.challenges.clone(),
            accounts: self.accounts.clone(),
            clock: self.clock.clone(),
            config: self.config.clone(),
        }
    }
}

impl<C, A> ChallengeService<C, A>
where
    C: ChallengeRepository,
    A: AccountLockRepository,
{
    pub fn new(
        challenges: Arc<C>,
        accounts: Arc<A>,
        clock: Arc<dyn Clock>,
        config: OtpConfig,
    ) -> Self {
        Self {
            challenges,
            accounts,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    /// Issue a fresh code for the user, replacing any previous challenge.
    ///
    /// The replaced challenge stops verifying immediately, whatever state
    /// it was in.
    pub async fn issue(&self, user_id: &UserId) -> Result<OtpChallenge, Error> {
        let code = generate_code();
        let challenge = self
            .challenges
            .upsert(user_id, &code, self.clock.now())
            .await?;

        tracing::info!(user_id = %user_id, "Issued one-time password");
        Ok(challenge)
    }

    pub async fn get(&self, user_id: &UserId) -> Result<Option<OtpChallenge>, Error> {
        self.challenges.get(user_id).await
    }

    /// Whether the challenge's validity window has elapsed.
    pub fn is_expired(&self, challenge: &OtpChallenge) -> bool {
        challenge.is_expired(self.clock.now(), self.config.otp_validity)
    }

    pub async fn record_failed_try(&self, user_id: &UserId) -> Result<Option<u32>, Error> {
        self.challenges.record_failed_try(user_id).await
    }

    pub async fn reset_tries(&self, user_id: &UserId) -> Result<(), Error> {
        self.challenges.reset_tries(user_id).await
    }

    pub async fn consume(&self, user_id: &UserId, code: &str) -> Result<bool, Error> {
        self.challenges.consume_active(user_id, code).await
    }

    /// Deactivate the user's challenge if it is still the one we observed.
    pub async fn expire_for_user(&self, user_id: &UserId) -> Result<bool, Error> {
        match self.challenges.get(user_id).await? {
            Some(challenge) if challenge.active => {
                self.challenges
                    .expire_if_created_at(user_id, challenge.created_at)
                    .await
            }
            _ => Ok(false),
        }
    }

    /// Single-user counterpart of [`Self::sweep_expired`], for callers that
    /// notice the validity window run out before the next sweep.
    ///
    /// Applies the same rules as the sweep: only an elapsed challenge on an
    /// unlocked account is deactivated, and calling it again is a no-op.
    pub async fn expire_if_elapsed(&self, user_id: &UserId) -> Result<bool, Error> {
        let Some(challenge) = self.challenges.get(user_id).await? else {
            return Ok(false);
        };
        if !challenge.active || !self.is_expired(&challenge) {
            return Ok(false);
        }
        if self.accounts.lock_state(user_id).await?.locked {
            return Ok(false);
        }
        self.challenges
            .expire_if_created_at(user_id, challenge.created_at)
            .await
    }

    /// Deactivate every active challenge whose validity window has elapsed.
    ///
    /// Challenges belonging to locked accounts are left alone. Each
    /// deactivation is conditional on the observed `created_at`, so a
    /// concurrent re-issue wins over the sweep and running two sweeps at
    /// once expires each challenge exactly once.
    pub async fn sweep_expired(&self) -> Result<u64, Error> {
        let now = self.clock.now();
        let mut expired = 0u64;

        for challenge in self.challenges.list_active().await? {
            if !challenge.is_expired(now, self.config.otp_validity) {
                continue;
            }

            let state = self.accounts.lock_state(&challenge.user_id).await?;
            if state.locked {
                continue;
            }

            if self
                .challenges
                .expire_if_created_at(&challenge.user_id, challenge.created_at)
                .await?
            {
                expired += 1;
            }
        }

        if expired > 0 {
            tracing::info!(count = expired, "Expired stale one-time passwords");
        }
        Ok(expired)
    }

    /// Start the background expiry sweep.
    ///
    /// The task runs [`Self::sweep_expired`] once a minute until `shutdown`
    /// changes.
    pub fn start_sweep_task(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let service = self.clone();

        const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(SWEEP_INTERVAL);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        if let Err(e) = service.sweep_expired().await {
                            tracing::warn!(error = %e, "One-time password expiry sweep failed");
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down one-time password expiry sweep");
                        break;
                    }
                }
            }
        })
    }
}
