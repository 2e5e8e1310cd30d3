//! Configuration for the one-time password login flow.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Tunables for challenge issuance, verification and account lockout.
///
/// The defaults mirror a conservative interactive login setup: codes live
/// for five minutes, two wrong codes lock the account, and locks release
/// after five minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    /// How long an issued code stays valid.
    pub otp_validity: Duration,

    /// One-time passwords a user may request before the next unlock.
    pub max_otp_requests: u32,

    /// Wrong codes tolerated before the account locks.
    pub max_failed_otp_attempts: u32,

    /// How long a lock lasts before the deferred unlock releases it.
    pub block_time: Duration,

    /// Failed password attempts tolerated before the account locks.
    pub max_failed_password_attempts: u32,

    /// Whether denial messages include the stored lock/disable reason.
    pub show_lock_reason: bool,

    /// Reason recorded when a lock is placed without an explicit one.
    pub default_locked_reason: String,

    /// Reason recorded when an account is disabled without an explicit one.
    pub default_disabled_reason: String,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            otp_validity: Duration::minutes(5),
            max_otp_requests: 5,
            max_failed_otp_attempts: 2,
            block_time: Duration::minutes(5),
            max_failed_password_attempts: 5,
            show_lock_reason: false,
            default_locked_reason: "Locked after repeated failed login attempts".to_string(),
            default_disabled_reason: "Disabled by an administrator".to_string(),
        }
    }
}

impl OtpConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_otp_validity(mut self, validity: Duration) -> Self {
        self.otp_validity = validity;
        self
    }

    pub fn with_max_otp_requests(mut self, max: u32) -> Self {
        self.max_otp_requests = max;
        self
    }

    pub fn with_max_failed_otp_attempts(mut self, max: u32) -> Self {
        self.max_failed_otp_attempts = max;
        self
    }

    pub fn with_block_time(mut self, block_time: Duration) -> Self {
        self.block_time = block_time;
        self
    }

    pub fn with_max_failed_password_attempts(mut self, max: u32) -> Self {
        self.max_failed_password_attempts = max;
        self
    }

    pub fn with_show_lock_reason(mut self, show: bool) -> Self {
        self.show_lock_reason = show;
        self
    }

    pub fn block_time_minutes(&self) -> i64 {
        self.block_time.num_minutes()
    }

    pub fn otp_validity_minutes(&self) -> i64 {
        self.otp_validity.num_minutes()
    }
}
