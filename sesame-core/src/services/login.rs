//! Login flow orchestration.
//!
//! Ties users, challenges and lockout together into the user-facing flow:
//! resolve an identifier, issue a code, verify a submission. Refusals come
//! back as [`Denial`] values; `Err` is reserved for storage and
//! infrastructure failures.

use std::sync::Arc;

use crate::{
    Error,
    config::OtpConfig,
    outcome::{ChallengeReceipt, Denial, IssueOutcome, UserCheck, VerifyOutcome},
    repositories::{AccountLockRepository, ChallengeRepository, UserRepository},
    services::{ChallengeService, LockoutService, OtpNotifier},
    session::SessionEstablisher,
    user::User,
    validation::validate_email,
};

pub struct LoginFlow<U, C, A> {
    users: Arc<U>,
    challenges: Arc<ChallengeService<C, A>>,
    lockout: Arc<LockoutService<A, C>>,
    notifier: Option<Arc<dyn OtpNotifier>>,
    sessions: Option<Arc<dyn SessionEstablisher>>,
    config: OtpConfig,
}

impl<U, C, A> LoginFlow<U, C, A>
where
    U: UserRepository,
    C: ChallengeRepository,
    A: AccountLockRepository,
{
    pub fn new(
        users: Arc<U>,
        challenges: Arc<ChallengeService<C, A>>,
        lockout: Arc<LockoutService<A, C>>,
        notifier: Option<Arc<dyn OtpNotifier>>,
        sessions: Option<Arc<dyn SessionEstablisher>>,
        config: OtpConfig,
    ) -> Self {
        Self {
            users,
            challenges,
            lockout,
            notifier,
            sessions,
            config,
        }
    }

    /// Resolve a login identifier to a user: by email address when it
    /// parses as one, by username otherwise.
    pub async fn resolve(&self, identifier: &str) -> Result<Option<User>, Error> {
        if validate_email(identifier).is_ok() {
            self.users.find_by_email(identifier).await
        } else {
            self.users.find_by_username(identifier).await
        }
    }

    /// Pre-flight check before the password stage: the account must exist
    /// and not be locked.
    pub async fn check_user(&self, identifier: &str) -> Result<UserCheck, Error> {
        let Some(user) = self.resolve(identifier).await? else {
            return Ok(UserCheck::Denied(Denial::UnknownUser));
        };

        let state = self.lockout.lock_state(&user.id).await?;
        if state.locked {
            return Ok(UserCheck::Denied(self.lockout.locked_denial(&state)));
        }

        Ok(UserCheck::Registered)
    }

    /// Issue a one-time password and hand it to the notifier.
    ///
    /// A failed delivery is reported in the receipt but leaves the
    /// challenge valid; the user can retry or request a new code.
    pub async fn issue(&self, identifier: &str) -> Result<IssueOutcome, Error> {
        let Some(user) = self.resolve(identifier).await? else {
            return Ok(IssueOutcome::Denied(Denial::UnknownUser));
        };

        let state = self.lockout.lock_state(&user.id).await?;
        if state.disabled {
            return Ok(IssueOutcome::Denied(self.lockout.disabled_denial(&state)));
        }
        if state.locked {
            return Ok(IssueOutcome::Denied(self.lockout.locked_denial(&state)));
        }
        // Claim a slot in the request quota before issuing anything; the
        // conditional increment keeps concurrent issuers within the limit.
        if self.lockout.note_request(&user.id).await?.is_none() {
            tracing::warn!(user_id = %user.id, "One-time password request quota exceeded");
            return Ok(IssueOutcome::Denied(Denial::RequestQuotaExceeded));
        }

        let challenge = self.challenges.issue(&user.id).await?;
        // Reaching the second factor proves the password stage passed
        self.lockout.reset_bad_attempts(&user.id).await?;

        let delivered = match &self.notifier {
            Some(notifier) => match notifier.deliver(&user, &challenge.code).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        user_id = %user.id,
                        "Failed to deliver one-time password; the challenge stays valid"
                    );
                    false
                }
            },
            None => {
                tracing::debug!(user_id = %user.id, "No notifier configured; code not delivered");
                false
            }
        };

        Ok(IssueOutcome::Issued(ChallengeReceipt {
            masked_email: mask_email(&user.email),
            delivered,
        }))
    }

    /// Verify a submitted code against the user's pending challenge.
    pub async fn verify(&self, identifier: &str, submitted: &str) -> Result<VerifyOutcome, Error> {
        let Some(user) = self.resolve(identifier).await? else {
            return Ok(VerifyOutcome::Denied(Denial::UnknownUser));
        };

        // A locked or disabled account is refused before the challenge is
        // even looked at; locking deactivates the pending code, and the
        // caller should see the lock, not a stale-code denial.
        if let Some(denial) = self.lockout.gate(&user.id).await? {
            return Ok(VerifyOutcome::Denied(denial));
        }

        let Some(challenge) = self.challenges.get(&user.id).await? else {
            return Ok(VerifyOutcome::Denied(Denial::Expired));
        };

        if !challenge.active {
            return Ok(VerifyOutcome::Denied(Denial::Expired));
        }

        if self.challenges.is_expired(&challenge) {
            // The sweep has not caught this one yet
            self.challenges.expire_for_user(&user.id).await?;
            return Ok(VerifyOutcome::Denied(Denial::Expired));
        }

        if challenge.matches(submitted) {
            self.complete(user, &challenge.code).await
        } else {
            self.reject(user).await
        }
    }

    /// Correct code: consume the challenge and establish the session.
    async fn complete(&self, user: User, code: &str) -> Result<VerifyOutcome, Error> {
        // A lock placed after issuance still blocks the login
        if let Some(denial) = self.lockout.gate(&user.id).await? {
            return Ok(VerifyOutcome::Denied(denial));
        }

        if !self.challenges.consume(&user.id, code).await? {
            // Lost the race against another verifier or the sweep
            return Ok(VerifyOutcome::Denied(Denial::Expired));
        }

        self.challenges.reset_tries(&user.id).await?;

        let destination = match &self.sessions {
            Some(establisher) => establisher.establish(&user).await?.destination_url,
            None => None,
        };

        tracing::info!(user_id = %user.id, "One-time password verified");
        Ok(VerifyOutcome::Success { user, destination })
    }

    /// Wrong code: count the try and lock the account at the limit.
    async fn reject(&self, user: User) -> Result<VerifyOutcome, Error> {
        let Some(tries) = self.challenges.record_failed_try(&user.id).await? else {
            // The challenge went inactive while we were looking at it
            return Ok(VerifyOutcome::Denied(Denial::Expired));
        };

        if tries >= self.config.max_failed_otp_attempts {
            let reason = format!(
                "Locked for {} minutes after several incorrect one-time password attempts",
                self.config.block_time_minutes()
            );
            self.lockout.lock(&user.id, Some(&reason)).await?;

            let shown = self.config.show_lock_reason.then_some(reason);
            return Ok(VerifyOutcome::Denied(Denial::AccountLocked {
                reason: shown,
            }));
        }

        tracing::debug!(user_id = %user.id, tries = tries, "Incorrect one-time password");
        Ok(VerifyOutcome::Denied(Denial::IncorrectCode))
    }
}

/// Mask the leading half (rounded up) of an address for display, so the
/// login page can hint at the destination without revealing it.
pub fn mask_email(email: &str) -> String {
    let chars: Vec<char> = email.chars().collect();
    let masked = chars.len().div_ceil(2);
    chars
        .iter()
        .enumerate()
        .map(|(i, c)| if i < masked { 'X' } else { *c })
        .collect()
}
