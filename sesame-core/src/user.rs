//! User accounts
//!
//! This module contains the core user struct and related functionality.
//! Users sign in with a username or email address and prove ownership of
//! the account with a one-time password delivered out of band.

use crate::{
    Error,
    error::ValidationError,
    id::{generate_prefixed_id, validate_prefixed_id},
    validation::{validate_email, validate_username},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unique, stable identifier for a specific user.
/// This value should be treated as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: &str) -> Self {
        UserId(id.to_string())
    }

    pub fn new_random() -> Self {
        UserId(generate_prefixed_id("usr"))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that this ID has the correct format for a user ID
    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, "usr")
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new_random()
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Representation of a registered user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    // The unique identifier for the user.
    pub id: UserId,

    // The login name of the user.
    pub username: String,

    // The email address one-time passwords are delivered to.
    pub email: String,

    // The display name of the user, if known.
    pub name: Option<String>,

    // The created at timestamp.
    pub created_at: DateTime<Utc>,

    // The updated at timestamp.
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn builder() -> UserBuilder {
        UserBuilder::default()
    }
}

#[derive(Default)]
pub struct UserBuilder {
    id: Option<UserId>,
    username: Option<String>,
    email: Option<String>,
    name: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl UserBuilder {
    pub fn id(mut self, id: UserId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn username(mut self, username: String) -> Self {
        self.username = Some(username);
        self
    }

    pub fn email(mut self, email: String) -> Self {
        self.email = Some(email);
        self
    }

    pub fn name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn build(self) -> Result<User, Error> {
        let now = Utc::now();
        Ok(User {
            id: self.id.unwrap_or_default(),
            username: self
                .username
                .ok_or(ValidationError::MissingField("username".to_string()))?,
            email: self
                .email
                .ok_or(ValidationError::MissingField("email".to_string()))?,
            name: self.name,
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        })
    }
}

/// Parameters for creating a new user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
}

impl NewUser {
    pub fn new(username: String, email: String) -> Self {
        Self {
            id: UserId::new_random(),
            username,
            email,
            name: None,
        }
    }

    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    /// Check the username and email address before handing the record to
    /// a storage backend.
    pub fn validate(&self) -> Result<(), Error> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_format() {
        let id = UserId::new_random();
        assert!(id.is_valid());
        assert!(id.as_str().starts_with("usr_"));

        let handcrafted = UserId::new("not-a-real-id");
        assert!(!handcrafted.is_valid());
    }

    #[test]
    fn test_user_builder_requires_username_and_email() {
        let result = User::builder().email("alice@example.com".to_string()).build();
        assert!(result.is_err());

        let user = User::builder()
            .username("alice".to_string())
            .email("alice@example.com".to_string())
            .build()
            .unwrap();
        assert_eq!(user.username, "alice");
        assert!(user.id.is_valid());
    }

    #[test]
    fn test_new_user_validate() {
        let valid = NewUser::new("alice".to_string(), "alice@example.com".to_string());
        assert!(valid.validate().is_ok());

        let bad_email = NewUser::new("alice".to_string(), "not-an-email".to_string());
        assert!(bad_email.validate().is_err());

        let bad_username = NewUser::new("a".to_string(), "alice@example.com".to_string());
        assert!(bad_username.validate().is_err());
    }
}
