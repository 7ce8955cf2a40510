use super::{Mailer, OutgoingEmail};
use crate::server::metrics;
use anyhow::{Context, Result};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Implicit TLS, usually port 465.
    #[default]
    Tls,
    StartTls,
    /// No encryption at all, for local relays and mail catchers.
    Plain,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub security: SmtpSecurity,
}

/// Delivers mail through an SMTP relay on a blocking thread.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let from: Mailbox = settings
            .from
            .parse()
            .with_context(|| format!("Invalid sender address {}", settings.from))?;

        let mut builder = match settings.security {
            SmtpSecurity::Tls => SmtpTransport::relay(&settings.host)?,
            SmtpSecurity::StartTls => SmtpTransport::starttls_relay(&settings.host)?,
            SmtpSecurity::Plain => SmtpTransport::builder_dangerous(&settings.host),
        };
        if let Some(port) = settings.port {
            builder = builder.port(port);
        }
        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message> {
        let to: Mailbox = email
            .to
            .parse()
            .with_context(|| format!("Invalid recipient address {}", email.to))?;
        Ok(Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())?)
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, email: OutgoingEmail) -> Result<()> {
        let message = self.build_message(&email)?;
        let transport = self.transport.clone();
        let deliver = move || match transport.send(&message) {
            Ok(_) => {
                debug!("Sent email {:?} to {}", email.subject, email.to);
                metrics::record_email("sent");
            }
            Err(err) => {
                warn!("Could not send email to {}: {}", email.to, err);
                metrics::record_email("failed");
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(deliver);
            }
            Err(_) => deliver(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SmtpSettings {
        SmtpSettings {
            host: "localhost".to_string(),
            port: Some(2525),
            username: None,
            password: None,
            from: "Job Board <noreply@jobboard.test>".to_string(),
            security: SmtpSecurity::Plain,
        }
    }

    #[test]
    fn rejects_invalid_sender() {
        let result = SmtpMailer::new(&SmtpSettings {
            from: "nobody".to_string(),
            ..settings()
        });
        assert!(result.is_err());
    }

    #[test]
    fn rejects_invalid_recipient_without_connecting() {
        let mailer = SmtpMailer::new(&settings()).unwrap();
        let result = mailer.send(OutgoingEmail {
            to: "not an address".to_string(),
            subject: "Hello".to_string(),
            body: "Body".to_string(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn builds_plain_text_message() {
        let mailer = SmtpMailer::new(&settings()).unwrap();
        let message = mailer
            .build_message(&OutgoingEmail {
                to: "dev@example.com".to_string(),
                subject: "New application for Rust Developer".to_string(),
                body: "Body".to_string(),
            })
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: New application for Rust Developer"));
        assert!(raw.contains("To: dev@example.com"));
    }

    #[test]
    fn security_reads_lowercase() {
        let security: SmtpSecurity = serde_json::from_str("\"starttls\"").unwrap();
        assert_eq!(security, SmtpSecurity::StartTls);
    }
}
