//! Job applications and their review workflow

mod models;
mod sqlite_application_store;
mod store;
mod workflow;

pub use models::{
    Applicant, Application, ApplicationEvent, ApplicationFields, ApplicationForm,
    ApplicationSort, ApplicationStatus, CandidateApplication, Transition, EDIT_WINDOW,
};
pub use sqlite_application_store::SqliteApplicationStore;
pub use store::ApplicationStore;
pub use workflow::{
    ApplicationItem, ApplicationWorkflow, JobApplications, StatusUpdate, WorkflowError,
};
