use anyhow::{Context, Result};
use std::sync::Arc;

use tower_http::services::ServeDir;
use tracing::info;

use axum::{middleware, routing::get, Router};

use super::account_routes::make_account_routes;
use super::application_routes::make_application_routes;
use super::job_routes::make_job_routes;
use super::metrics::metrics_handler;
use super::{log_requests, state::ServerState, ServerConfig};
use crate::applications::{ApplicationWorkflow, SqliteApplicationStore};
use crate::clock::Clock;
use crate::jobs::{JobCatalog, SqliteJobStore};
use crate::mail::Mailer;
use crate::notifications::MailingNotificationDispatcher;
use crate::sqlite_persistence::SharedConnection;
use crate::uploads::LocalFileStorage;
use crate::user::{ActivationTokenGenerator, FullUserStore, SqliteUserStore, UserManager};

/// Everything the services need from the outside world.
pub struct ServerDependencies {
    pub connection: SharedConnection,
    pub clock: Arc<dyn Clock>,
    pub mailer: Arc<dyn Mailer>,
    pub activation: ActivationTokenGenerator,
    pub public_base_url: String,
}

impl ServerState {
    /// Wires the stores and services together on one database.
    pub fn new(config: ServerConfig, deps: ServerDependencies) -> Result<ServerState> {
        let storage = Arc::new(
            LocalFileStorage::new(&config.media_path)
                .with_context(|| format!("Cannot use media directory {:?}", config.media_path))?,
        );
        let user_store: Arc<dyn FullUserStore> =
            Arc::new(SqliteUserStore::new(deps.connection.clone()));
        let job_store = Arc::new(SqliteJobStore::new(deps.connection.clone()));
        let application_store = Arc::new(SqliteApplicationStore::new(deps.connection));

        let dispatcher = Arc::new(MailingNotificationDispatcher::new(
            user_store.clone(),
            job_store.clone(),
            deps.mailer.clone(),
            deps.clock.clone(),
        ));
        let user_manager = UserManager::new(
            user_store,
            deps.clock.clone(),
            deps.mailer,
            storage.clone(),
            deps.activation,
            deps.public_base_url,
        );
        let catalog = JobCatalog::new(
            job_store.clone(),
            application_store.clone(),
            deps.clock.clone(),
        );
        let workflow = ApplicationWorkflow::new(
            application_store,
            job_store,
            dispatcher,
            storage,
            deps.clock,
        );

        Ok(ServerState {
            config,
            user_manager: Arc::new(user_manager),
            catalog: Arc::new(catalog),
            workflow: Arc::new(workflow),
        })
    }
}

pub fn make_app(state: ServerState) -> Router {
    let media_service = ServeDir::new(&state.config.media_path);

    Router::new()
        .nest("/accounts", make_account_routes(state.clone()))
        .merge(make_job_routes(state.clone()))
        .merge(make_application_routes(state.clone()))
        .nest_service("/media", media_service)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_server(state: ServerState) -> Result<()> {
    let port = state.config.port;
    let metrics_port = state.config.metrics_port;
    let app = make_app(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Cannot listen on port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Cannot listen on metrics port {}", metrics_port))?;

    info!("Ready to serve at port {}!", port);
    info!("Metrics available at port {}!", metrics_port);

    tokio::select! {
        result = axum::serve(listener, app) => {
            info!("HTTP server stopped: {:?}", result);
            Ok(result?)
        },
        result = axum::serve(metrics_listener, make_metrics_app()) => {
            info!("Metrics server stopped: {:?}", result);
            Ok(result?)
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}
