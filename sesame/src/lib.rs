//! # Sesame
//!
//! Sesame is a second-factor login system built around short-lived numeric
//! one-time passwords. After the host application checks a user's password,
//! sesame takes over: it issues a six-digit code, delivers it out of band,
//! verifies the user's submission, and locks accounts that attract too many
//! failed attempts. Locks release themselves after a configurable block
//! time.
//!
//! User data stays in your database: storage backends implement the
//! repository traits from `sesame-core`, and everything else is wired up
//! for you.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sesame::{Sesame, NewUser, IssueOutcome, VerifyOutcome};
//! use sesame_storage_sqlite::SqliteRepositoryProvider;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = sqlx::SqlitePool::connect("sqlite:auth.db").await?;
//!     let repositories = Arc::new(SqliteRepositoryProvider::new(pool));
//!
//!     let sesame = Sesame::new(repositories);
//!     sesame.migrate().await?;
//!
//!     sesame
//!         .create_user(NewUser::new(
//!             "alice".to_string(),
//!             "alice@example.com".to_string(),
//!         ))
//!         .await?;
//!
//!     // Password stage passed; issue the second factor
//!     match sesame.issue_code("alice").await? {
//!         IssueOutcome::Issued(receipt) => {
//!             println!("Code sent to {}", receipt.masked_email);
//!         }
//!         IssueOutcome::Denied(denial) => println!("{}", denial.message()),
//!     }
//!
//!     // Later, verify what the user typed
//!     match sesame.verify_code("alice", "123456").await? {
//!         VerifyOutcome::Success { user, .. } => println!("Welcome {}", user.username),
//!         VerifyOutcome::Denied(denial) => println!("{}", denial.message()),
//!     }
//!
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

use sesame_core::{
    Clock, Scheduler, SystemClock, TokioScheduler,
    repositories::{
        AccountLockRepositoryAdapter, ChallengeRepositoryAdapter, RepositoryProvider,
        UserRepositoryAdapter,
    },
    services::{ChallengeService, LockoutService, LoginFlow, OtpNotifier},
    session::SessionEstablisher,
};

/// Re-export core types from sesame_core
///
/// These types are commonly used when working with the Sesame API.
pub use sesame_core::{
    ChallengeReceipt, Denial, Error, EstablishedSession, IssueOutcome, LockState, NewUser,
    OtpChallenge, OtpConfig, User, UserCheck, UserId, VerifyOutcome,
    services::PasswordAttempt,
};

/// Re-export storage backends
///
/// These storage implementations are available when the corresponding feature is enabled.
#[cfg(feature = "sqlite")]
pub use sesame_storage_sqlite::SqliteRepositoryProvider;

#[cfg(feature = "mailer")]
pub use sesame_mailer::MailerConfig;

type Challenges<R> =
    ChallengeService<ChallengeRepositoryAdapter<R>, AccountLockRepositoryAdapter<R>>;
type Lockout<R> = LockoutService<AccountLockRepositoryAdapter<R>, ChallengeRepositoryAdapter<R>>;
type Flow<R> = LoginFlow<
    UserRepositoryAdapter<R>,
    ChallengeRepositoryAdapter<R>,
    AccountLockRepositoryAdapter<R>,
>;

/// The main coordinator wiring services to a storage backend.
///
/// `Sesame` owns the challenge, lockout and login-flow services and exposes
/// the operations a host application needs. Construct one with
/// [`Sesame::new`] for the defaults, or through [`Sesame::builder`] to
/// inject a notifier, session establisher, clock or scheduler.
pub struct Sesame<R: RepositoryProvider> {
    repositories: Arc<R>,
    users: Arc<UserRepositoryAdapter<R>>,
    challenges: Arc<Challenges<R>>,
    lockout: Arc<Lockout<R>>,
    flow: Arc<Flow<R>>,
}

impl<R: RepositoryProvider> Sesame<R> {
    /// Create a Sesame instance with default configuration: system clock,
    /// in-process scheduler, no notifier, no session establisher.
    pub fn new(repositories: Arc<R>) -> Self {
        Self::builder(repositories).build()
    }

    pub fn builder(repositories: Arc<R>) -> SesameBuilder<R> {
        SesameBuilder::new(repositories)
    }

    /// Run storage migrations.
    pub async fn migrate(&self) -> Result<(), Error> {
        self.repositories.migrate().await
    }

    /// Check that the storage backend is reachable.
    pub async fn health_check(&self) -> Result<(), Error> {
        self.repositories.health_check().await
    }

    /// Register a new user account.
    pub async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        use sesame_core::repositories::UserRepository;
        self.users.create(user).await
    }

    /// Look up a user by ID.
    pub async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, Error> {
        use sesame_core::repositories::UserRepository;
        self.users.find_by_id(user_id).await
    }

    /// Pre-flight check before the password stage.
    pub async fn check_user(&self, identifier: &str) -> Result<UserCheck, Error> {
        self.flow.check_user(identifier).await
    }

    /// Issue a one-time password for the user behind `identifier` and hand
    /// it to the configured notifier.
    pub async fn issue_code(&self, identifier: &str) -> Result<IssueOutcome, Error> {
        self.flow.issue(identifier).await
    }

    /// Verify a submitted one-time password.
    pub async fn verify_code(
        &self,
        identifier: &str,
        code: &str,
    ) -> Result<VerifyOutcome, Error> {
        self.flow.verify(identifier, code).await
    }

    /// Report a failed password attempt from the first login stage.
    ///
    /// `attempt_token` identifies the attempt so that duplicate reports of
    /// the same failure count once.
    pub async fn report_failed_password(
        &self,
        user_id: &UserId,
        attempt_token: &str,
    ) -> Result<PasswordAttempt, Error> {
        self.lockout.record_failed_password(user_id, attempt_token).await
    }

    /// Report a fully completed login; releases any lock on the account.
    pub async fn report_successful_login(&self, user_id: &UserId) -> Result<(), Error> {
        self.lockout.record_successful_login(user_id).await
    }

    /// The lock state of an account.
    pub async fn lock_state(&self, user_id: &UserId) -> Result<LockState, Error> {
        self.lockout.lock_state(user_id).await
    }

    /// Lock an account now. The lock schedules its own release.
    pub async fn lock_account(
        &self,
        user_id: &UserId,
        reason: Option<&str>,
    ) -> Result<(), Error> {
        self.lockout.lock(user_id, reason).await
    }

    /// Release a lock immediately. Returns whether a lock was released.
    pub async fn unlock_account(&self, user_id: &UserId) -> Result<bool, Error> {
        self.lockout.unlock(user_id).await
    }

    /// Release a lock only if its block time has run out.
    pub async fn release_lock_if_due(&self, user_id: &UserId) -> Result<bool, Error> {
        self.lockout.release_if_due(user_id).await
    }

    /// Disable an account until [`Self::enable_account`] is called.
    pub async fn disable_account(
        &self,
        user_id: &UserId,
        reason: Option<&str>,
    ) -> Result<(), Error> {
        self.lockout.disable(user_id, reason).await
    }

    /// Re-enable a disabled account.
    pub async fn enable_account(&self, user_id: &UserId) -> Result<bool, Error> {
        self.lockout.enable(user_id).await
    }

    /// Deactivate every one-time password whose validity window has
    /// elapsed. Returns how many were expired.
    pub async fn sweep_expired_codes(&self) -> Result<u64, Error> {
        self.challenges.sweep_expired().await
    }

    /// Expire one user's code ahead of the next sweep, with the same rules
    /// the sweep applies. Safe to call redundantly; returns whether a code
    /// was expired.
    pub async fn expire_code_if_elapsed(&self, user_id: &UserId) -> Result<bool, Error> {
        self.challenges.expire_if_elapsed(user_id).await
    }

    /// Start the background task running the expiry sweep once a minute.
    pub fn start_sweep_task(
        &self,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        self.challenges.start_sweep_task(shutdown)
    }
}

/// Builder for [`Sesame`] instances.
pub struct SesameBuilder<R: RepositoryProvider> {
    repositories: Arc<R>,
    config: OtpConfig,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    notifier: Option<Arc<dyn OtpNotifier>>,
    sessions: Option<Arc<dyn SessionEstablisher>>,
}

impl<R: RepositoryProvider> SesameBuilder<R> {
    fn new(repositories: Arc<R>) -> Self {
        Self {
            repositories,
            config: OtpConfig::default(),
            clock: Arc::new(SystemClock),
            scheduler: Arc::new(TokioScheduler::new()),
            notifier: None,
            sessions: None,
        }
    }

    pub fn config(mut self, config: OtpConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn OtpNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn session_establisher(mut self, establisher: Arc<dyn SessionEstablisher>) -> Self {
        self.sessions = Some(establisher);
        self
    }

    /// Deliver one-time passwords by email through `sesame-mailer`.
    #[cfg(feature = "mailer")]
    pub fn mailer(mut self, mailer_config: &MailerConfig) -> Result<Self, Error> {
        let notifier = sesame_core::services::MailerOtpNotifier::new(
            mailer_config,
            self.config.otp_validity_minutes(),
        )?;
        self.notifier = Some(Arc::new(notifier));
        Ok(self)
    }

    pub fn build(self) -> Sesame<R> {
        let users = Arc::new(UserRepositoryAdapter::new(self.repositories.clone()));
        let challenge_repo = Arc::new(ChallengeRepositoryAdapter::new(self.repositories.clone()));
        let account_repo = Arc::new(AccountLockRepositoryAdapter::new(self.repositories.clone()));

        let challenges = Arc::new(ChallengeService::new(
            challenge_repo.clone(),
            account_repo.clone(),
            self.clock.clone(),
            self.config.clone(),
        ));
        let lockout = Arc::new(LockoutService::new(
            account_repo,
            challenge_repo,
            self.clock,
            self.scheduler,
            self.config.clone(),
        ));
        let flow = Arc::new(LoginFlow::new(
            users.clone(),
            challenges.clone(),
            lockout.clone(),
            self.notifier,
            self.sessions,
            self.config,
        ));

        Sesame {
            repositories: self.repositories,
            users,
            challenges,
            lockout,
            flow,
        }
    }
}
