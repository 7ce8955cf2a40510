use super::models::{EmployerAnalytics, Job, JobFields, JobListing, SavedJob};
use super::search::{JobSearch, Page};
use anyhow::Result;
use std::collections::HashSet;

pub trait JobStore: Send + Sync {
    fn create_job(&self, employer_id: usize, fields: &JobFields, posted_at: i64) -> Result<Job>;

    /// Returns Ok(None) if the job does not exist.
    fn get_job(&self, job_id: usize) -> Result<Option<Job>>;

    /// Like [`JobStore::get_job`], with the application count.
    fn get_job_listing(&self, job_id: usize) -> Result<Option<JobListing>>;

    /// Returns Ok(None) if the job does not exist or belongs to another employer.
    fn get_employer_job(&self, job_id: usize, employer_id: usize) -> Result<Option<Job>>;

    /// Overwrites the editable fields of a job owned by `employer_id`.
    /// Returns Ok(false) if there is no such job.
    fn update_job(&self, job_id: usize, employer_id: usize, fields: &JobFields) -> Result<bool>;

    /// Deletes a job owned by `employer_id`, together with its applications and saves.
    /// Returns Ok(false) if there is no such job.
    fn delete_job(&self, job_id: usize, employer_id: usize) -> Result<bool>;

    /// Runs a search and returns the requested page of results.
    fn search_jobs(&self, search: &JobSearch, page: Option<&str>) -> Result<Page<JobListing>>;

    /// The most recently posted Open jobs.
    fn latest_jobs(&self, limit: usize) -> Result<Vec<JobListing>>;

    /// Distinct categories of Open jobs, alphabetically.
    fn categories(&self, limit: usize) -> Result<Vec<String>>;

    /// Every job of the employer whatever its status, newest first.
    fn employer_jobs(&self, employer_id: usize) -> Result<Vec<JobListing>>;

    /// The Open jobs of the employer, newest first.
    fn open_jobs_of_employer(&self, employer_id: usize) -> Result<Vec<JobListing>>;

    fn employer_analytics(&self, employer_id: usize) -> Result<EmployerAnalytics>;

    /// Open jobs sharing a category or job type with the jobs the user applied
    /// to, excluding those. Falls back to the latest Open jobs when the user
    /// never applied.
    fn recommended_jobs(&self, user_id: usize, limit: usize) -> Result<Vec<JobListing>>;

    /// Saves the job for the user, or removes it if it was already saved.
    /// Returns Ok(true) if the job is now saved.
    fn toggle_saved_job(&self, user_id: usize, job_id: usize, at: i64) -> Result<bool>;

    /// The user's saved jobs, most recently saved first.
    fn saved_jobs(&self, user_id: usize, limit: Option<usize>) -> Result<Vec<SavedJob>>;

    fn count_saved_jobs(&self, user_id: usize) -> Result<usize>;

    /// The subset of `job_ids` the user has saved.
    fn saved_job_ids(&self, user_id: usize, job_ids: &[usize]) -> Result<HashSet<usize>>;
}
