use super::models::{
    Applicant, Application, ApplicationFields, ApplicationSort, ApplicationStatus,
    CandidateApplication,
};
use anyhow::Result;
use std::collections::HashSet;

pub trait ApplicationStore: Send + Sync {
    /// Returns Ok(None) if the user already applied to the job.
    fn create_application(
        &self,
        user_id: usize,
        job_id: usize,
        fields: &ApplicationFields,
        applied_at: i64,
    ) -> Result<Option<Application>>;

    fn get_application(&self, application_id: usize) -> Result<Option<Application>>;

    /// The application of `user_id` to `job_id`, if any.
    fn get_user_application(&self, user_id: usize, job_id: usize) -> Result<Option<Application>>;

    /// Overwrites the candidate-editable fields. A None resume in `fields`
    /// keeps the current one.
    fn update_application_fields(
        &self,
        application_id: usize,
        fields: &ApplicationFields,
    ) -> Result<()>;

    fn set_application_status(
        &self,
        application_id: usize,
        status: ApplicationStatus,
    ) -> Result<()>;

    /// The user's applications with their jobs.
    fn applications_of_user(
        &self,
        user_id: usize,
        sort: ApplicationSort,
        limit: Option<usize>,
    ) -> Result<Vec<CandidateApplication>>;

    fn count_applications_of_user(&self, user_id: usize) -> Result<usize>;

    /// Applicants of a job, newest first. Withdrawn applications are left out.
    fn applicants_of_job(&self, job_id: usize) -> Result<Vec<Applicant>>;

    /// An application with its candidate's username and email.
    fn get_applicant(&self, application_id: usize) -> Result<Option<Applicant>>;

    /// The subset of `job_ids` the user applied to.
    fn applied_job_ids(&self, user_id: usize, job_ids: &[usize]) -> Result<HashSet<usize>>;
}
