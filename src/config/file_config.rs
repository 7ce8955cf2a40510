use crate::mail::SmtpSecurity;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,
    pub media_path: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub public_base_url: Option<String>,

    // Account activation
    pub activation_secret: Option<String>,
    pub activation_token_ttl_hours: Option<u64>,

    pub mail: Option<MailConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct MailConfig {
    /// Without a host, mail is written to the log instead.
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub security: Option<SmtpSecurity>,
    pub from: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_section() {
        let config: FileConfig = toml::from_str(
            r#"
            db_path = "/var/lib/jobboard/jobboard.db"
            port = 8000
            activation_secret = "s3cret"
            activation_token_ttl_hours = 24

            [mail]
            smtp_host = "smtp.example.com"
            smtp_port = 587
            security = "starttls"
            from = "JobPortal <noreply@example.com>"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, Some(8000));
        assert_eq!(config.activation_token_ttl_hours, Some(24));
        let mail = config.mail.unwrap();
        assert_eq!(mail.smtp_host.as_deref(), Some("smtp.example.com"));
        assert_eq!(mail.security, Some(SmtpSecurity::StartTls));
        assert!(mail.smtp_username.is_none());
    }

    #[test]
    fn empty_file_is_valid() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.db_path.is_none());
        assert!(config.mail.is_none());
    }
}
