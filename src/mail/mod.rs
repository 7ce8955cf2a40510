//! Outbound email. Delivery is best effort: callers hand a message over and
//! never wait for, or learn about, the outcome.

mod smtp;

pub use smtp::{SmtpMailer, SmtpSecurity, SmtpSettings};

use crate::server::metrics;
use anyhow::Result;
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub trait Mailer: Send + Sync {
    /// Queues `email` for delivery.
    /// Returns Err only if the message cannot be built, delivery failures are logged.
    fn send(&self, email: OutgoingEmail) -> Result<()>;
}

/// Writes every message to the log instead of delivering it.
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, email: OutgoingEmail) -> Result<()> {
        info!(
            "Email to {} with subject {:?}:\n{}",
            email.to, email.subject, email.body
        );
        metrics::record_email("logged");
        Ok(())
    }
}

/// Keeps every message in memory, used by tests to inspect outbound mail.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, address: &str) -> Vec<OutgoingEmail> {
        self.sent()
            .into_iter()
            .filter(|email| email.to == address)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, email: OutgoingEmail) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("Recording mailer mutex is poisoned"))?
            .push(email);
        Ok(())
    }
}
