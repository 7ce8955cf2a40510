use axum::extract::FromRef;

use crate::applications::ApplicationWorkflow;
use crate::jobs::JobCatalog;
use crate::user::UserManager;
use std::sync::Arc;

use super::ServerConfig;

pub type GuardedUserManager = Arc<UserManager>;
pub type GuardedJobCatalog = Arc<JobCatalog>;
pub type GuardedApplicationWorkflow = Arc<ApplicationWorkflow>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub user_manager: GuardedUserManager,
    pub catalog: GuardedJobCatalog,
    pub workflow: GuardedApplicationWorkflow,
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedJobCatalog {
    fn from_ref(input: &ServerState) -> Self {
        input.catalog.clone()
    }
}

impl FromRef<ServerState> for GuardedApplicationWorkflow {
    fn from_ref(input: &ServerState) -> Self {
        input.workflow.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
