mod account_routes;
mod application_routes;
pub mod config;
mod http_layers;
mod job_routes;
pub mod metrics;
mod multipart;
pub mod responses;
pub mod server;
pub(self) mod session;
pub mod state;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server, ServerDependencies};
pub use state::ServerState;
