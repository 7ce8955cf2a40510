//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own database, media directory,
//! clock and mailbox.

use super::constants::*;
use super::fixtures::create_test_db_with_users;
use jobboard_server::clock::ManualClock;
use jobboard_server::mail::RecordingMailer;
use jobboard_server::server::{
    make_app, RequestsLoggingLevel, ServerConfig, ServerDependencies, ServerState,
};
use jobboard_server::user::{
    ActivationTokenGenerator, FullUserStore, SqliteUserStore, DEFAULT_ACTIVATION_TTL,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with an isolated database
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// The clock every service reads, moved forward by tests
    pub clock: Arc<ManualClock>,

    /// Every email the server sent
    pub mailer: Arc<RecordingMailer>,

    /// User store for direct database access in tests
    pub user_store: Arc<dyn FullUserStore>,

    /// Where uploads end up
    pub media_path: PathBuf,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// This function:
    /// 1. Creates a temporary database with test users
    /// 2. Binds to a random port (127.0.0.1:0)
    /// 3. Spawns the server in a background task
    /// 4. Waits for the server to be ready
    ///
    /// # Panics
    ///
    /// Panics if:
    /// - Database creation fails
    /// - Port binding fails
    /// - Server doesn't become ready within timeout
    pub async fn spawn() -> Self {
        let (temp_dir, _db_path, connection) =
            create_test_db_with_users().expect("Failed to create test database");
        let media_path = temp_dir.path().join("media");

        let user_store: Arc<dyn FullUserStore> =
            Arc::new(SqliteUserStore::new(connection.clone()));
        let clock = Arc::new(ManualClock::new(START_TIME));
        let mailer = Arc::new(RecordingMailer::new());

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            media_path: media_path.clone(),
            ..Default::default()
        };
        let deps = ServerDependencies {
            connection,
            clock: clock.clone(),
            mailer: mailer.clone(),
            activation: ActivationTokenGenerator::new(
                b"test-activation-secret".to_vec(),
                DEFAULT_ACTIVATION_TTL,
            ),
            public_base_url: base_url.clone(),
        };
        let state = ServerState::new(config, deps).expect("Failed to build server state");
        let app = make_app(state);

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            clock,
            mailer,
            user_store,
            media_path,
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Moves the server clock forward
    pub fn advance_hours(&self, hours: u64) {
        self.clock
            .advance(Duration::from_secs(hours * ONE_HOUR_SECS));
    }

    /// Waits for the server to become ready by polling the home page
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
