pub mod config;
pub mod email;
pub mod error;
pub mod mailer;
pub mod templates;
pub mod transports;

pub use config::{MailerConfig, TransportConfig};
pub use email::{Email, EmailBuilder};
pub use error::MailerError;
pub use mailer::Mailer;
pub use templates::{OtpCodeEmail, TemplateContext};
pub use transports::{FileTransport, SmtpTransport};

pub mod prelude {
    pub use crate::{
        Email, EmailBuilder, FileTransport, Mailer, MailerConfig, MailerError, OtpCodeEmail,
        SmtpTransport, TemplateContext, TransportConfig,
    };
}
