//! Account lock state
//!
//! Tracks whether an account is locked (temporary, usually released by a
//! deferred unlock) or disabled (indefinite, administrative), together with
//! the counters that feed the lockout decisions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The lock-related state of a single account.
///
/// An account with no stored state is unlocked with zeroed counters, which
/// is what [`LockState::default`] returns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockState {
    pub locked: bool,
    pub locked_reason: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,

    pub disabled: bool,
    pub disabled_reason: Option<String>,

    /// Failed password attempts since the last reset.
    pub bad_attempts: u32,

    /// One-time passwords issued since the last unlock.
    pub request_count: u32,
}

impl LockState {
    /// Whether a lock placed at `locked_at` has run out at `now`.
    ///
    /// Returns `false` for unlocked accounts and for locks with no recorded
    /// timestamp; the latter can only be released explicitly.
    pub fn is_lock_elapsed(&self, now: DateTime<Utc>, block_time: Duration) -> bool {
        if !self.locked {
            return false;
        }
        match self.locked_at {
            Some(locked_at) => now > locked_at + block_time,
            None => false,
        }
    }
}
