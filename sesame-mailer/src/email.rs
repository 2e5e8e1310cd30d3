use crate::MailerError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    pub to: Vec<String>,
    pub from: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
}

impl Email {
    pub fn builder() -> EmailBuilder {
        EmailBuilder::default()
    }

    pub fn validate(&self) -> Result<(), MailerError> {
        if self.to.is_empty() {
            return Err(MailerError::Builder(
                "At least one recipient is required".to_string(),
            ));
        }

        if self.from.is_empty() {
            return Err(MailerError::Builder("From address is required".to_string()));
        }

        if self.subject.is_empty() {
            return Err(MailerError::Builder("Subject is required".to_string()));
        }

        if self.html_body.is_none() && self.text_body.is_none() {
            return Err(MailerError::Builder(
                "Either HTML or text body is required".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct EmailBuilder {
    to: Vec<String>,
    from: Option<String>,
    reply_to: Option<String>,
    subject: Option<String>,
    html_body: Option<String>,
    text_body: Option<String>,
}

impl EmailBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to<S: Into<String>>(mut self, email: S) -> Self {
        self.to.push(email.into());
        self
    }

    pub fn from<S: Into<String>>(mut self, email: S) -> Self {
        self.from = Some(email.into());
        self
    }

    pub fn reply_to<S: Into<String>>(mut self, email: S) -> Self {
        self.reply_to = Some(email.into());
        self
    }

    pub fn subject<S: Into<String>>(mut self, subject: S) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn html_body<S: Into<String>>(mut self, body: S) -> Self {
        self.html_body = Some(body.into());
        self
    }

    pub fn text_body<S: Into<String>>(mut self, body: S) -> Self {
        self.text_body = Some(body.into());
        self
    }

    pub fn build(self) -> Result<Email, MailerError> {
        let email = Email {
            to: self.to,
            from: self
                .from
                .ok_or_else(|| MailerError::Builder("From address is required".to_string()))?,
            reply_to: self.reply_to,
            subject: self
                .subject
                .ok_or_else(|| MailerError::Builder("Subject is required".to_string()))?,
            html_body: self.html_body,
            text_body: self.text_body,
        };

        email.validate()?;
        Ok(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_complete_email() {
        let email = Email::builder()
            .from("login@example.com")
            .to("user@example.com")
            .subject("Your verification code")
            .text_body("123456")
            .build()
            .unwrap();

        assert_eq!(email.to, vec!["user@example.com".to_string()]);
        assert_eq!(email.from, "login@example.com");
    }

    #[test]
    fn rejects_email_without_body() {
        let result = Email::builder()
            .from("login@example.com")
            .to("user@example.com")
            .subject("Your verification code")
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn rejects_email_without_recipient() {
        let result = Email::builder()
            .from("login@example.com")
            .subject("Your verification code")
            .text_body("123456")
            .build();

        assert!(result.is_err());
    }
}
