//! Input validation helpers shared by services and storage backends.

use crate::error::{Error, ValidationError};
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$")
        .expect("Invalid email regex")
});

pub fn validate_email(email: &str) -> Result<(), Error> {
    if email.is_empty() || email.len() > 254 || !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(email.to_string()).into());
    }
    Ok(())
}

/// Usernames are 3-60 characters of alphanumerics plus `.`, `-`, `_` and `@`
/// so that an email address is always also a valid username.
pub fn validate_username(username: &str) -> Result<(), Error> {
    if username.len() < 3 || username.len() > 60 {
        return Err(ValidationError::InvalidUsername(username.to_string()).into());
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '@'))
    {
        return Err(ValidationError::InvalidUsername(username.to_string()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("user.name+tag@example.co.uk").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("plainaddress").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("alice.smith-42").is_ok());
        assert!(validate_username("alice@example.com").is_ok());

        assert!(validate_username("ab").is_err());
        assert!(validate_username("alice smith").is_err());
        assert!(validate_username(&"a".repeat(61)).is_err());
    }
}
