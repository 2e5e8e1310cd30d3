//! Business logic services
//!
//! Services own the login semantics and talk to storage through the
//! repository traits:
//!
//! - [`ChallengeService`] issues and expires one-time passwords
//! - [`LockoutService`] drives the account lock state machine
//! - [`LoginFlow`] orchestrates the two into the user-facing flow

pub mod challenge;
pub mod lockout;
pub mod login;
pub mod notifier;

pub use challenge::ChallengeService;
pub use lockout::{LockoutService, PasswordAttempt};
pub use login::{LoginFlow, mask_email};
pub use notifier::OtpNotifier;

#[cfg(feature = "mailer")]
pub use notifier::MailerOtpNotifier;

/// In-memory repository doubles shared by the service test modules.
#[cfg(test)]
pub(crate) mod test_support {
    use crate::{
        Error,
        challenge::OtpChallenge,
        lockout::LockState,
        repositories::{AccountLockRepository, ChallengeRepository, UserRepository},
        user::{NewUser, User, UserId},
    };
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockUserRepository {
        pub users: Mutex<Vec<User>>,
    }

    impl MockUserRepository {
        pub fn with_user(username: &str, email: &str) -> (Self, User) {
            let user = User::builder()
                .username(username.to_string())
                .email(email.to_string())
                .build()
                .unwrap();
            let repo = Self {
                users: Mutex::new(vec![user.clone()]),
            };
            (repo, user)
        }
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn create(&self, user: NewUser) -> Result<User, Error> {
            user.validate()?;
            let user = User::builder()
                .id(user.id)
                .username(user.username)
                .email(user.email)
                .name(user.name)
                .build()?;
            self.users.lock().unwrap().push(user.clone());
            Ok(user)
        }

        async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| &u.id == id)
                .cloned())
        }

        async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.username == username)
                .cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.email == email)
                .cloned())
        }
    }

    #[derive(Default)]
    pub struct MockChallengeRepository {
        pub challenges: Mutex<HashMap<UserId, OtpChallenge>>,
    }

    #[async_trait]
    impl ChallengeRepository for MockChallengeRepository {
        async fn upsert(
            &self,
            user_id: &UserId,
            code: &str,
            created_at: DateTime<Utc>,
        ) -> Result<OtpChallenge, Error> {
            let challenge = OtpChallenge {
                user_id: user_id.clone(),
                code: code.to_string(),
                tries: 0,
                created_at,
                active: true,
            };
            self.challenges
                .lock()
                .unwrap()
                .insert(user_id.clone(), challenge.clone());
            Ok(challenge)
        }

        async fn get(&self, user_id: &UserId) -> Result<Option<OtpChallenge>, Error> {
            Ok(self.challenges.lock().unwrap().get(user_id).cloned())
        }

        async fn record_failed_try(&self, user_id: &UserId) -> Result<Option<u32>, Error> {
            let mut challenges = self.challenges.lock().unwrap();
            match challenges.get_mut(user_id) {
                Some(challenge) if challenge.active => {
                    challenge.tries += 1;
                    Ok(Some(challenge.tries))
                }
                _ => Ok(None),
            }
        }

        async fn reset_tries(&self, user_id: &UserId) -> Result<(), Error> {
            if let Some(challenge) = self.challenges.lock().unwrap().get_mut(user_id) {
                challenge.tries = 0;
            }
            Ok(())
        }

        async fn consume_active(&self, user_id: &UserId, code: &str) -> Result<bool, Error> {
            let mut challenges = self.challenges.lock().unwrap();
            match challenges.get_mut(user_id) {
                Some(challenge) if challenge.active && challenge.code == code => {
                    challenge.active = false;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn expire_if_created_at(
            &self,
            user_id: &UserId,
            observed_created_at: DateTime<Utc>,
        ) -> Result<bool, Error> {
            let mut challenges = self.challenges.lock().unwrap();
            match challenges.get_mut(user_id) {
                Some(challenge)
                    if challenge.active && challenge.created_at == observed_created_at =>
                {
                    challenge.active = false;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn deactivate(&self, user_id: &UserId) -> Result<bool, Error> {
            let mut challenges = self.challenges.lock().unwrap();
            match challenges.get_mut(user_id) {
                Some(challenge) if challenge.active => {
                    challenge.active = false;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn list_active(&self) -> Result<Vec<OtpChallenge>, Error> {
            Ok(self
                .challenges
                .lock()
                .unwrap()
                .values()
                .filter(|c| c.active)
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct StoredLock {
        state: LockState,
        last_attempt_token: Option<String>,
    }

    #[derive(Default)]
    pub struct MockAccountLockRepository {
        locks: Mutex<HashMap<UserId, StoredLock>>,
    }

    impl MockAccountLockRepository {
        fn with_entry<T>(&self, user_id: &UserId, f: impl FnOnce(&mut StoredLock) -> T) -> T {
            let mut locks = self.locks.lock().unwrap();
            f(locks.entry(user_id.clone()).or_default())
        }
    }

    #[async_trait]
    impl AccountLockRepository for MockAccountLockRepository {
        async fn lock_state(&self, user_id: &UserId) -> Result<LockState, Error> {
            Ok(self
                .locks
                .lock()
                .unwrap()
                .get(user_id)
                .map(|l| l.state.clone())
                .unwrap_or_default())
        }

        async fn set_locked(
            &self,
            user_id: &UserId,
            reason: Option<&str>,
            locked_at: DateTime<Utc>,
        ) -> Result<(), Error> {
            self.with_entry(user_id, |lock| {
                lock.state.locked = true;
                lock.state.locked_reason = reason.map(|r| r.to_string());
                lock.state.locked_at = Some(locked_at);
            });
            Ok(())
        }

        async fn clear_lock(&self, user_id: &UserId) -> Result<bool, Error> {
            Ok(self.with_entry(user_id, |lock| {
                let was_locked = lock.state.locked;
                lock.state.locked = false;
                lock.state.locked_reason = None;
                lock.state.locked_at = None;
                was_locked
            }))
        }

        async fn set_disabled(&self, user_id: &UserId, reason: Option<&str>) -> Result<(), Error> {
            self.with_entry(user_id, |lock| {
                lock.state.disabled = true;
                lock.state.disabled_reason = reason.map(|r| r.to_string());
            });
            Ok(())
        }

        async fn clear_disabled(&self, user_id: &UserId) -> Result<bool, Error> {
            Ok(self.with_entry(user_id, |lock| {
                let was_disabled = lock.state.disabled;
                lock.state.disabled = false;
                lock.state.disabled_reason = None;
                was_disabled
            }))
        }

        async fn record_bad_attempt(
            &self,
            user_id: &UserId,
            attempt_token: &str,
        ) -> Result<Option<u32>, Error> {
            Ok(self.with_entry(user_id, |lock| {
                if lock.last_attempt_token.as_deref() == Some(attempt_token) {
                    return None;
                }
                lock.last_attempt_token = Some(attempt_token.to_string());
                lock.state.bad_attempts += 1;
                Some(lock.state.bad_attempts)
            }))
        }

        async fn reset_bad_attempts(&self, user_id: &UserId) -> Result<(), Error> {
            self.with_entry(user_id, |lock| {
                lock.state.bad_attempts = 0;
                lock.last_attempt_token = None;
            });
            Ok(())
        }

        async fn increment_request_count_if_below(
            &self,
            user_id: &UserId,
            limit: u32,
        ) -> Result<Option<u32>, Error> {
            Ok(self.with_entry(user_id, |lock| {
                if lock.state.request_count >= limit {
                    return None;
                }
                lock.state.request_count += 1;
                Some(lock.state.request_count)
            }))
        }

        async fn reset_request_count(&self, user_id: &UserId) -> Result<(), Error> {
            self.with_entry(user_id, |lock| lock.state.request_count = 0);
            Ok(())
        }
    }

    /// Scheduler double that records jobs and lets tests fire them by hand.
    #[derive(Default)]
    pub struct RecordingScheduler {
        jobs: Mutex<HashMap<String, (std::time::Duration, Option<crate::scheduler::ScheduledJob>)>>,
    }

    impl RecordingScheduler {
        pub fn scheduled_keys(&self) -> Vec<String> {
            self.jobs.lock().unwrap().keys().cloned().collect()
        }

        pub fn delay_for(&self, key: &str) -> Option<std::time::Duration> {
            self.jobs.lock().unwrap().get(key).map(|(delay, _)| *delay)
        }

        /// Run the recorded job for `key`, as if its timer had fired.
        pub async fn fire(&self, key: &str) -> bool {
            let job = self
                .jobs
                .lock()
                .unwrap()
                .get_mut(key)
                .and_then(|(_, job)| job.take());
            match job {
                Some(job) => {
                    job.await;
                    true
                }
                None => false,
            }
        }
    }

    impl crate::scheduler::Scheduler for RecordingScheduler {
        fn schedule_once(
            &self,
            key: &str,
            delay: std::time::Duration,
            job: crate::scheduler::ScheduledJob,
        ) -> Result<(), Error> {
            self.jobs
                .lock()
                .unwrap()
                .insert(key.to_string(), (delay, Some(job)));
            Ok(())
        }

        fn cancel(&self, key: &str) -> bool {
            self.jobs.lock().unwrap().remove(key).is_some()
        }
    }

    /// Scheduler double whose registrations always fail.
    pub struct FailingScheduler;

    impl crate::scheduler::Scheduler for FailingScheduler {
        fn schedule_once(
            &self,
            _key: &str,
            _delay: std::time::Duration,
            _job: crate::scheduler::ScheduledJob,
        ) -> Result<(), Error> {
            Err(Error::Schedule("scheduler unavailable".to_string()))
        }

        fn cancel(&self, _key: &str) -> bool {
            false
        }
    }
}
