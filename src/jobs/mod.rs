mod catalog;
mod job_store;
mod models;
mod search;
mod sqlite_job_store;

pub use catalog::{
    CatalogError, EmployerDashboard, HomePage, JobCatalog, JobDetail, SearchResults,
    SeekerDashboard,
};
pub use job_store::JobStore;
pub use models::{
    CategoryApplicationCount, EmployerAnalytics, Job, JobApplicationCount, JobFields, JobForm,
    JobListing, JobStatus, JobType, MonthlyPostings, SavedJob,
};
pub use search::{JobSearch, Page, SearchParams, SortOrder, PAGE_SIZE};
pub(crate) use search::JOB_COLUMNS;
pub use sqlite_job_store::SqliteJobStore;
pub(crate) use sqlite_job_store::job_from_row;
