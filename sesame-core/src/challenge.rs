//! One-time password challenges
//!
//! A challenge is the single pending one-time password for a user. Each user
//! has at most one row: issuing a new code replaces the previous one in
//! place, resetting the failed-try counter and reactivating the row.

use crate::user::UserId;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of digits in a one-time password.
pub const OTP_CODE_LENGTH: usize = 6;

/// A pending (or recently consumed) one-time password for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub user_id: UserId,

    /// The code, stored as text to preserve leading formatting.
    pub code: String,

    /// Failed verification attempts against this code.
    pub tries: u32,

    pub created_at: DateTime<Utc>,

    /// Inactive challenges never verify; they are kept until the next
    /// issuance replaces them.
    pub active: bool,
}

impl OtpChallenge {
    /// Whether the validity window has elapsed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, validity: Duration) -> bool {
        now - self.created_at > validity
    }

    /// Constant-length comparison is not required here: codes are short-lived
    /// and rate-limited by the try counter.
    pub fn matches(&self, submitted: &str) -> bool {
        self.code == submitted
    }
}

/// Generate a six-digit code. The range excludes leading zeros.
pub fn generate_code() -> String {
    let code: u32 = rand::rng().random_range(100_000..=999_999);
    code.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), OTP_CODE_LENGTH);
            assert!(code.parse::<u32>().unwrap() >= 100_000);
        }
    }

    #[test]
    fn test_expiry_window() {
        let challenge = OtpChallenge {
            user_id: UserId::new_random(),
            code: generate_code(),
            tries: 0,
            created_at: Utc::now(),
            active: true,
        };

        let validity = Duration::minutes(5);
        assert!(!challenge.is_expired(challenge.created_at + Duration::minutes(4), validity));
        assert!(!challenge.is_expired(challenge.created_at + Duration::minutes(5), validity));
        assert!(challenge.is_expired(
            challenge.created_at + Duration::minutes(5) + Duration::seconds(1),
            validity
        ));
    }
}
