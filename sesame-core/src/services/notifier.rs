//! Out-of-band delivery of one-time passwords.

use crate::{Error, user::User};
use async_trait::async_trait;

/// Delivers a freshly issued code to its user.
///
/// Delivery failures are reported to the caller but never invalidate the
/// challenge; the login flow logs them and carries on.
#[async_trait]
pub trait OtpNotifier: Send + Sync {
    async fn deliver(&self, user: &User, code: &str) -> Result<(), Error>;
}

/// Notifier that sends codes by email through `sesame-mailer`.
#[cfg(feature = "mailer")]
pub struct MailerOtpNotifier {
    transport: Box<dyn sesame_mailer::Mailer>,
    from: String,
    context: sesame_mailer::TemplateContext,
    validity_minutes: i64,
}

#[cfg(feature = "mailer")]
impl MailerOtpNotifier {
    pub fn new(
        config: &sesame_mailer::MailerConfig,
        validity_minutes: i64,
    ) -> Result<Self, Error> {
        let transport = config
            .build_transport()
            .map_err(|e| Error::Delivery(e.to_string()))?;

        Ok(Self {
            transport,
            from: config.get_from_address(),
            context: sesame_mailer::TemplateContext {
                app_name: config.app_name.clone(),
                app_url: config.app_url.clone(),
                user_name: None,
            },
            validity_minutes,
        })
    }
}

#[cfg(feature = "mailer")]
#[async_trait]
impl OtpNotifier for MailerOtpNotifier {
    async fn deliver(&self, user: &User, code: &str) -> Result<(), Error> {
        let mut context = self.context.clone();
        context.user_name = user.name.clone();

        let email = sesame_mailer::OtpCodeEmail::build(
            &self.from,
            &user.email,
            code,
            self.validity_minutes,
            context,
        )
        .map_err(|e| Error::Delivery(e.to_string()))?;

        self.transport
            .send_email(email)
            .await
            .map_err(|e| Error::Delivery(e.to_string()))?;

        tracing::debug!(user_id = %user.id, "Delivered one-time password email");
        Ok(())
    }
}
