//! Core functionality for the sesame one-time password login ecosystem.
//!
//! This crate provides the building blocks for a second-factor login flow
//! based on short-lived numeric one-time passwords:
//!
//! - User, challenge and lock-state types
//! - Repository traits that storage backends implement
//! - Services implementing challenge issuance, verification and account lockout
//! - A login flow orchestrator tying the services together
//!
//! Storage backends live in separate crates (e.g. `sesame-storage-sqlite`)
//! and plug in through the [`repositories::RepositoryProvider`] trait.

pub mod challenge;
pub mod clock;
pub mod config;
pub mod error;
pub mod id;
pub mod lockout;
pub mod outcome;
pub mod repositories;
pub mod scheduler;
pub mod services;
pub mod session;
pub mod user;
pub mod validation;

pub use challenge::OtpChallenge;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::OtpConfig;
pub use error::{Error, StorageError, ValidationError};
pub use lockout::LockState;
pub use outcome::{ChallengeReceipt, Denial, IssueOutcome, UserCheck, VerifyOutcome};
pub use scheduler::{Scheduler, TokioScheduler};
pub use session::{EstablishedSession, SessionEstablisher};
pub use user::{NewUser, User, UserId};
