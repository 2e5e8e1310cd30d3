mod file;
mod smtp;

pub use file::FileTransport;
pub use smtp::{SmtpTransport, SmtpTransportBuilder, TlsConfig};

use crate::{Email, MailerError};
use lettre::Message;

/// Convert our transport-agnostic [`Email`] into a lettre [`Message`].
pub(crate) fn build_message(email: Email) -> Result<Message, MailerError> {
    let mut message_builder = Message::builder()
        .from(email.from.parse()?)
        .subject(email.subject);

    for to in email.to {
        message_builder = message_builder.to(to.parse()?);
    }

    if let Some(reply_to) = email.reply_to {
        message_builder = message_builder.reply_to(reply_to.parse()?);
    }

    // Prefer multipart when both bodies are present
    let message = if let Some(html) = email.html_body {
        if let Some(text) = email.text_body {
            message_builder.multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(lettre::message::SinglePart::plain(text))
                    .singlepart(lettre::message::SinglePart::html(html)),
            )?
        } else {
            message_builder.body(html)?
        }
    } else if let Some(text) = email.text_body {
        message_builder.body(text)?
    } else {
        return Err(MailerError::Builder("No email body provided".to_string()));
    };

    Ok(message)
}
