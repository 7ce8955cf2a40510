//! Job board server library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod applications;
pub mod clock;
pub mod config;
pub mod jobs;
pub mod mail;
pub mod notifications;
pub mod server;
pub mod sqlite_persistence;
pub mod uploads;
pub mod user;
pub mod validation;

// Re-export commonly used types for convenience
pub use server::{run_server, RequestsLoggingLevel};
pub use user::{SqliteUserStore, UserManager};
