//! Session establishment seam.
//!
//! Verification proves account ownership; what "being signed in" means is
//! up to the host application. Implementations of [`SessionEstablisher`]
//! plug in cookie sessions, JWTs, or whatever the application uses.

use crate::{Error, user::User};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The result of establishing a session after a verified login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstablishedSession {
    /// Where to send the user next, e.g. a dashboard URL.
    pub destination_url: Option<String>,
}

#[async_trait]
pub trait SessionEstablisher: Send + Sync {
    /// Called exactly once per successfully verified login.
    async fn establish(&self, user: &User) -> Result<EstablishedSession, Error>;
}
