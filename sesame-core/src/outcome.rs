//! Login flow outcomes
//!
//! Refusals during issuance and verification are expected states of the
//! flow, not errors; [`crate::Error`] is reserved for storage and
//! infrastructure failures. Callers match on these enums to decide what to
//! show the end user.

use crate::user::User;
use serde::{Deserialize, Serialize};

/// Why an issue or verify request was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Denial {
    /// The identifier does not resolve to a registered account.
    UnknownUser,

    /// The account has been disabled by an administrator.
    AccountDisabled { reason: Option<String> },

    /// The account is locked, typically pending a deferred unlock.
    AccountLocked { reason: Option<String> },

    /// The account has issued too many one-time passwords since its last
    /// unlock.
    RequestQuotaExceeded,

    /// No usable challenge exists: never issued, already consumed, expired,
    /// or deactivated.
    Expired,

    /// The submitted code does not match the pending challenge.
    IncorrectCode,
}

impl Denial {
    /// A human-readable message suitable for display to the end user.
    pub fn message(&self) -> String {
        match self {
            Denial::UnknownUser => {
                "This username is not registered. If you are unsure of your username, try your email address instead.".to_string()
            }
            Denial::AccountDisabled { reason } => match reason {
                Some(reason) => format!("This user account is disabled: {reason}"),
                None => "This user account is disabled.".to_string(),
            },
            Denial::AccountLocked { reason } => match reason {
                Some(reason) => format!("This user account is locked: {reason}"),
                None => "This user account is locked for security reasons.".to_string(),
            },
            Denial::RequestQuotaExceeded => {
                "You have exceeded the maximum number of one-time password requests.".to_string()
            }
            Denial::Expired => {
                "The one-time password is expired. Please request a new one and try again."
                    .to_string()
            }
            Denial::IncorrectCode => {
                "The one-time password entered is incorrect. Please try again.".to_string()
            }
        }
    }
}

/// Result of a pre-flight account check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCheck {
    /// The identifier resolves to an account that may proceed.
    Registered,
    Denied(Denial),
}

/// Details returned to the caller after a successful issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeReceipt {
    /// The delivery address with the leading half of its characters masked.
    pub masked_email: String,

    /// Whether the notifier reported successful delivery. The challenge is
    /// valid either way.
    pub delivered: bool,
}

/// Result of requesting a one-time password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueOutcome {
    Issued(ChallengeReceipt),
    Denied(Denial),
}

/// Result of submitting a one-time password.
#[derive(Debug, Clone)]
pub enum VerifyOutcome {
    Success {
        user: User,
        /// Where the caller should send the user next, when a session
        /// establisher provides one.
        destination: Option<String>,
    },
    Denied(Denial),
}
