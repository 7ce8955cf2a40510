mod file_config;

pub use file_config::{FileConfig, MailConfig};

use crate::mail::SmtpSettings;
use crate::server::RequestsLoggingLevel;
use crate::user::DEFAULT_ACTIVATION_TTL;
use anyhow::{bail, Result};
use clap::ValueEnum;
use rand::Rng;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SENDER: &str = "JobPortal <noreply@jobportal.local>";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub media_path: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_path: PathBuf,
    pub media_path: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    /// Scheme and host that links in outgoing emails point to.
    pub public_base_url: String,

    pub activation: ActivationSettings,

    /// None when mail should only be logged.
    pub smtp: Option<SmtpSettings>,
}

#[derive(Clone)]
pub struct ActivationSettings {
    pub secret: Vec<u8>,
    pub ttl: Duration,
    /// True if no secret was configured and a random one is in use.
    pub generated_secret: bool,
}

impl std::fmt::Debug for ActivationSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationSettings")
            .field("ttl", &self.ttl)
            .field("generated_secret", &self.generated_secret)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;

        // The database file may be created, its directory must exist
        let db_dir = match db_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !db_dir.is_dir() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }

        let media_path = file
            .media_path
            .map(PathBuf::from)
            .or_else(|| cli.media_path.clone())
            .unwrap_or_else(|| db_dir.join("media"));

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let public_base_url = file
            .public_base_url
            .or_else(|| cli.public_base_url.clone())
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        let activation = match file.activation_secret.filter(|s| !s.is_empty()) {
            Some(secret) => ActivationSettings {
                secret: secret.into_bytes(),
                ttl: DEFAULT_ACTIVATION_TTL,
                generated_secret: false,
            },
            None => ActivationSettings {
                secret: rand::rng().random::<[u8; 32]>().to_vec(),
                ttl: DEFAULT_ACTIVATION_TTL,
                generated_secret: true,
            },
        };
        let activation = match file.activation_token_ttl_hours {
            Some(0) => bail!("activation_token_ttl_hours must be positive"),
            Some(hours) => ActivationSettings {
                ttl: Duration::from_secs(hours * 60 * 60),
                ..activation
            },
            None => activation,
        };

        // Mail settings - without an SMTP host everything goes to the log
        let mail = file.mail.unwrap_or_default();
        let smtp = mail
            .smtp_host
            .filter(|host| !host.trim().is_empty())
            .map(|host| SmtpSettings {
                host,
                port: mail.smtp_port,
                username: mail.smtp_username,
                password: mail.smtp_password,
                from: mail.from.unwrap_or_else(|| DEFAULT_SENDER.to_string()),
                security: mail.security.unwrap_or_default(),
            });

        Ok(Self {
            db_path,
            media_path,
            port,
            metrics_port,
            logging_level,
            public_base_url,
            activation,
            smtp,
        })
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
