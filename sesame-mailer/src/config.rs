use crate::transports::TlsConfig;
use crate::{FileTransport, Mailer, MailerError, SmtpTransport};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    pub transport: TransportConfig,
    pub from_address: String,
    pub from_name: Option<String>,
    pub app_name: String,
    pub app_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    Smtp {
        host: String,
        port: Option<u16>,
        username: Option<String>,
        password: Option<String>,
        tls: Option<TlsType>,
    },
    File {
        output_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsType {
    None,
    StartTls,
    Tls,
}

impl From<TlsType> for TlsConfig {
    fn from(tls_type: TlsType) -> Self {
        match tls_type {
            TlsType::None => TlsConfig::None,
            TlsType::StartTls => TlsConfig::StartTls,
            TlsType::Tls => TlsConfig::Tls,
        }
    }
}

impl MailerConfig {
    pub fn from_env() -> Result<Self, MailerError> {
        let transport = if let Ok(smtp_host) = std::env::var("MAILER_SMTP_HOST") {
            TransportConfig::Smtp {
                host: smtp_host,
                port: std::env::var("MAILER_SMTP_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok()),
                username: std::env::var("MAILER_SMTP_USERNAME").ok(),
                password: std::env::var("MAILER_SMTP_PASSWORD").ok(),
                tls: None,
            }
        } else if let Ok(output_dir) = std::env::var("MAILER_FILE_DIR") {
            TransportConfig::File {
                output_dir: PathBuf::from(output_dir),
            }
        } else {
            return Err(MailerError::Config(
                "No mailer transport configured: set MAILER_SMTP_HOST or MAILER_FILE_DIR"
                    .to_string(),
            ));
        };

        Ok(Self {
            transport,
            from_address: std::env::var("MAILER_FROM_ADDRESS")
                .map_err(|_| MailerError::Config("MAILER_FROM_ADDRESS is required".to_string()))?,
            from_name: std::env::var("MAILER_FROM_NAME").ok(),
            app_name: std::env::var("MAILER_APP_NAME").unwrap_or_else(|_| "Your App".to_string()),
            app_url: std::env::var("MAILER_APP_URL")
                .unwrap_or_else(|_| "http://localhost".to_string()),
        })
    }

    /// `From` header value, `Name <address>` when a display name is set.
    pub fn get_from_address(&self) -> String {
        match &self.from_name {
            Some(name) => format!("{} <{}>", name, self.from_address),
            None => self.from_address.clone(),
        }
    }

    pub fn build_transport(&self) -> Result<Box<dyn Mailer>, MailerError> {
        match &self.transport {
            TransportConfig::Smtp {
                host,
                port,
                username,
                password,
                tls,
            } => {
                let mut builder = SmtpTransport::builder(host);

                if let Some(port) = port {
                    builder = builder.port(*port);
                }

                if let (Some(username), Some(password)) = (username, password) {
                    builder = builder.credentials(username, password);
                }

                if let Some(tls) = tls {
                    builder = builder.tls(tls.clone().into());
                }

                Ok(Box::new(builder.build()?))
            }
            TransportConfig::File { output_dir } => Ok(Box::new(FileTransport::new(output_dir)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_address_includes_display_name() {
        let config = MailerConfig {
            transport: TransportConfig::File {
                output_dir: PathBuf::from("/tmp/mail"),
            },
            from_address: "login@example.com".to_string(),
            from_name: Some("Example Login".to_string()),
            app_name: "Example".to_string(),
            app_url: "https://example.com".to_string(),
        };

        assert_eq!(
            config.get_from_address(),
            "Example Login <login@example.com>"
        );
    }
}
