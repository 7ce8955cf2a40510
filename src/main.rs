use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::{fmt::Debug, path::PathBuf};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jobboard_server::clock::SystemClock;
use jobboard_server::config;
use jobboard_server::mail::{LogMailer, Mailer, SmtpMailer};
use jobboard_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use jobboard_server::server::{ServerDependencies, ServerState};
use jobboard_server::sqlite_persistence::open_database;
use jobboard_server::user::ActivationTokenGenerator;

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| e.to_string())?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML configuration file. Its values override the flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database file, created if missing.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Directory uploaded resumes and logos are kept in.
    /// Defaults to a "media" directory next to the database.
    #[clap(long, value_parser = parse_path)]
    pub media_path: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 8000)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Scheme and host used in links sent by email, e.g. https://jobs.example.com
    #[clap(long)]
    pub public_base_url: Option<String>,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_path: args.db_path.clone(),
            media_path: args.media_path.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            public_base_url: args.public_base_url.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    info!(
        "Starting jobboard-server {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_path: {:?}", app_config.db_path);
    info!("  media_path: {:?}", app_config.media_path);
    info!("  port: {}", app_config.port);
    info!("  public_base_url: {}", app_config.public_base_url);
    if app_config.activation.generated_secret {
        warn!("No activation_secret configured, activation links will not survive a restart");
    }

    // Initialize metrics system
    info!("Initializing metrics...");
    metrics::init_metrics();

    if !app_config.db_path.exists() {
        info!("Creating new database at {:?}", app_config.db_path);
    }
    let connection = open_database(&app_config.db_path)?;

    let mailer: Arc<dyn Mailer> = match &app_config.smtp {
        Some(smtp) => {
            info!("Sending mail through {}", smtp.host);
            Arc::new(SmtpMailer::new(smtp)?)
        }
        None => {
            info!("No SMTP host configured, outgoing mail is only logged");
            Arc::new(LogMailer)
        }
    };

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
        media_path: app_config.media_path.clone(),
    };
    let state = ServerState::new(
        server_config,
        ServerDependencies {
            connection,
            clock: Arc::new(SystemClock),
            mailer,
            activation: ActivationTokenGenerator::new(
                app_config.activation.secret.clone(),
                app_config.activation.ttl,
            ),
            public_base_url: app_config.public_base_url.clone(),
        },
    )?;

    run_server(state).await
}
