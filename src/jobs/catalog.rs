//! Role-gated operations over the job catalog: posting and managing jobs,
//! searching, bookmarking and the two dashboards.

use super::job_store::JobStore;
use super::models::{EmployerAnalytics, Job, JobForm, JobListing, JobStatus, SavedJob};
use super::search::{JobSearch, Page, SearchParams};
use crate::applications::{ApplicationSort, ApplicationStore, CandidateApplication};
use crate::clock::Clock;
use crate::user::{Account, Role};
use crate::validation::FormErrors;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

const HOME_JOBS: usize = 6;
const HOME_CATEGORIES: usize = 8;
const DASHBOARD_ITEMS: usize = 5;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Only employers can manage jobs.")]
    EmployersOnly,

    #[error("This page is for job seekers.")]
    JobSeekersOnly,

    #[error("Please verify your email before posting jobs.")]
    EmailNotVerified,

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Invalid(#[from] FormErrors),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct HomePage {
    pub latest_jobs: Vec<JobListing>,
    pub categories: Vec<String>,
    pub job_types: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub page: Page<JobListing>,
    pub params: SearchParams,
    /// Jobs of this page the caller saved, empty for anonymous callers and employers.
    pub saved_job_ids: BTreeSet<usize>,
    /// Jobs of this page the caller applied to, empty for anonymous callers and employers.
    pub applied_job_ids: BTreeSet<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub listing: JobListing,
    pub applied: bool,
    pub is_saved: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployerDashboard {
    pub open_jobs: Vec<JobListing>,
    pub closed_jobs: Vec<JobListing>,
    pub draft_jobs: Vec<JobListing>,
    pub total_jobs: usize,
    pub total_applications: usize,
    pub analytics: EmployerAnalytics,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeekerDashboard {
    pub recommended_jobs: Vec<JobListing>,
    pub recent_applications: Vec<CandidateApplication>,
    pub saved_jobs: Vec<SavedJob>,
    pub total_applications: usize,
    pub total_saved: usize,
}

pub struct JobCatalog {
    jobs: Arc<dyn JobStore>,
    applications: Arc<dyn ApplicationStore>,
    clock: Arc<dyn Clock>,
}

impl JobCatalog {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        applications: Arc<dyn ApplicationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            jobs,
            applications,
            clock,
        }
    }

    pub fn home(&self) -> Result<HomePage, CatalogError> {
        Ok(HomePage {
            latest_jobs: self.jobs.latest_jobs(HOME_JOBS)?,
            categories: self.jobs.categories(HOME_CATEGORIES)?,
            job_types: super::models::JobType::ALL
                .iter()
                .map(|job_type| job_type.as_str())
                .collect(),
        })
    }

    pub fn search(
        &self,
        params: SearchParams,
        viewer: Option<&Account>,
    ) -> Result<SearchResults, CatalogError> {
        let search = JobSearch::from_params(&params);
        let page = self.jobs.search_jobs(&search, params.page.as_deref())?;

        let mut saved_job_ids = BTreeSet::new();
        let mut applied_job_ids = BTreeSet::new();
        if let Some(seeker) = viewer.filter(|account| account.role() == Role::JobSeeker) {
            let ids: Vec<usize> = page.items.iter().map(|listing| listing.job.id).collect();
            saved_job_ids.extend(self.jobs.saved_job_ids(seeker.id(), &ids)?);
            applied_job_ids.extend(self.applications.applied_job_ids(seeker.id(), &ids)?);
        }

        Ok(SearchResults {
            page,
            params,
            saved_job_ids,
            applied_job_ids,
        })
    }

    /// Any job can be looked at by id, whatever its status.
    pub fn job_detail(
        &self,
        job_id: usize,
        viewer: Option<&Account>,
    ) -> Result<JobDetail, CatalogError> {
        let listing = self
            .jobs
            .get_job_listing(job_id)?
            .ok_or(CatalogError::NotFound)?;
        let (applied, is_saved) = match viewer {
            Some(account) => (
                self.applications
                    .get_user_application(account.id(), job_id)?
                    .is_some(),
                !self.jobs.saved_job_ids(account.id(), &[job_id])?.is_empty(),
            ),
            None => (false, false),
        };
        Ok(JobDetail {
            listing,
            applied,
            is_saved,
        })
    }

    fn require_employer(account: &Account) -> Result<(), CatalogError> {
        match account.role() {
            Role::Employer => Ok(()),
            Role::JobSeeker => Err(CatalogError::EmployersOnly),
        }
    }

    /// Posts a job owned by the calling employer.
    pub fn create_job(&self, account: &Account, form: &JobForm) -> Result<Job, CatalogError> {
        Self::require_employer(account)?;
        if !account.profile.email_verified {
            return Err(CatalogError::EmailNotVerified);
        }
        let fields = form.validate()?;
        let job = self
            .jobs
            .create_job(account.id(), &fields, self.clock.now())?;
        info!("Employer {} posted job {}", account.id(), job.id);
        Ok(job)
    }

    /// Looks a job up through its owner, NotFound for anybody else.
    pub fn employer_job(&self, account: &Account, job_id: usize) -> Result<Job, CatalogError> {
        Self::require_employer(account)?;
        self.jobs
            .get_employer_job(job_id, account.id())?
            .ok_or(CatalogError::NotFound)
    }

    pub fn edit_job(
        &self,
        account: &Account,
        job_id: usize,
        form: &JobForm,
    ) -> Result<Job, CatalogError> {
        let job = self.employer_job(account, job_id)?;
        let fields = form.validate()?;
        if !self.jobs.update_job(job.id, account.id(), &fields)? {
            return Err(CatalogError::NotFound);
        }
        self.jobs
            .get_job(job.id)?
            .ok_or(CatalogError::NotFound)
    }

    pub fn delete_job(&self, account: &Account, job_id: usize) -> Result<(), CatalogError> {
        Self::require_employer(account)?;
        if !self.jobs.delete_job(job_id, account.id())? {
            return Err(CatalogError::NotFound);
        }
        info!("Employer {} deleted job {}", account.id(), job_id);
        Ok(())
    }

    /// Bookmarks an Open job, or removes the bookmark.
    /// Returns true if the job is now saved.
    pub fn toggle_save(&self, account: &Account, job_id: usize) -> Result<bool, CatalogError> {
        match self.jobs.get_job(job_id)? {
            Some(job) if job.is_open() => {
                Ok(self
                    .jobs
                    .toggle_saved_job(account.id(), job_id, self.clock.now())?)
            }
            _ => Err(CatalogError::NotFound),
        }
    }

    pub fn saved_jobs(&self, account: &Account) -> Result<Vec<SavedJob>, CatalogError> {
        Ok(self.jobs.saved_jobs(account.id(), None)?)
    }

    pub fn employer_dashboard(&self, account: &Account) -> Result<EmployerDashboard, CatalogError> {
        Self::require_employer(account)?;
        let jobs = self.jobs.employer_jobs(account.id())?;
        let analytics = self.jobs.employer_analytics(account.id())?;

        let total_jobs = jobs.len();
        let total_applications = jobs.iter().map(|listing| listing.application_count).sum();
        let mut dashboard = EmployerDashboard {
            open_jobs: vec![],
            closed_jobs: vec![],
            draft_jobs: vec![],
            total_jobs,
            total_applications,
            analytics,
        };
        for listing in jobs {
            match listing.job.status {
                JobStatus::Open => dashboard.open_jobs.push(listing),
                JobStatus::Closed => dashboard.closed_jobs.push(listing),
                JobStatus::Draft => dashboard.draft_jobs.push(listing),
            }
        }
        Ok(dashboard)
    }

    pub fn seeker_dashboard(&self, account: &Account) -> Result<SeekerDashboard, CatalogError> {
        if account.role() == Role::Employer {
            return Err(CatalogError::JobSeekersOnly);
        }
        let user_id = account.id();
        Ok(SeekerDashboard {
            recommended_jobs: self.jobs.recommended_jobs(user_id, DASHBOARD_ITEMS)?,
            recent_applications: self.applications.applications_of_user(
                user_id,
                ApplicationSort::Recent,
                Some(DASHBOARD_ITEMS),
            )?,
            saved_jobs: self.jobs.saved_jobs(user_id, Some(DASHBOARD_ITEMS))?,
            total_applications: self.applications.count_applications_of_user(user_id)?,
            total_saved: self.jobs.count_saved_jobs(user_id)?,
        })
    }

    /// The Open jobs listed on a company page.
    pub fn company_jobs(&self, employer_id: usize) -> Result<Vec<JobListing>, CatalogError> {
        Ok(self.jobs.open_jobs_of_employer(employer_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applications::{ApplicationFields, SqliteApplicationStore};
    use crate::clock::ManualClock;
    use crate::jobs::SqliteJobStore;
    use crate::sqlite_persistence::open_in_memory_database;
    use crate::user::{Profile, User};

    struct Fixture {
        catalog: JobCatalog,
        applications: Arc<SqliteApplicationStore>,
        conn: crate::sqlite_persistence::SharedConnection,
    }

    fn fixture() -> Fixture {
        let conn = open_in_memory_database().unwrap();
        let applications = Arc::new(SqliteApplicationStore::new(conn.clone()));
        let catalog = JobCatalog::new(
            Arc::new(SqliteJobStore::new(conn.clone())),
            applications.clone(),
            Arc::new(ManualClock::new(1_700_000_000)),
        );
        Fixture {
            catalog,
            applications,
            conn,
        }
    }

    impl Fixture {
        fn account(&self, username: &str, role: Role, verified: bool) -> Account {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO user (username, email, created) VALUES (?1, '', 0)",
                rusqlite::params![username],
            )
            .unwrap();
            let id = conn.last_insert_rowid() as usize;
            conn.execute(
                "INSERT INTO profile (user_id, role, email_verified) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, role.as_str(), verified],
            )
            .unwrap();
            let mut profile = Profile::new(id, role);
            profile.email_verified = verified;
            Account {
                user: User {
                    id,
                    username: username.to_string(),
                    email: String::new(),
                    created: 0,
                    last_login: None,
                },
                profile,
            }
        }
    }

    fn job_form(title: &str, status: &str) -> JobForm {
        JobForm {
            title: title.to_string(),
            company: "Acme".to_string(),
            location: "Berlin".to_string(),
            category: "IT".to_string(),
            description: "Build things".to_string(),
            status: status.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn only_verified_employers_post_jobs() {
        let f = fixture();
        let seeker = f.account("sam", Role::JobSeeker, true);
        let unverified = f.account("acme", Role::Employer, false);
        let employer = f.account("globex", Role::Employer, true);

        assert!(matches!(
            f.catalog.create_job(&seeker, &job_form("Dev", "")),
            Err(CatalogError::EmployersOnly)
        ));
        assert!(matches!(
            f.catalog.create_job(&unverified, &job_form("Dev", "")),
            Err(CatalogError::EmailNotVerified)
        ));
        assert!(matches!(
            f.catalog.create_job(&employer, &job_form("", "")),
            Err(CatalogError::Invalid(_))
        ));

        let job = f.catalog.create_job(&employer, &job_form("Dev", "")).unwrap();
        assert_eq!(job.employer_id, employer.id());
        assert_eq!(job.status, JobStatus::Open);
        assert_eq!(job.posted_at, 1_700_000_000);
    }

    #[test]
    fn other_employers_get_not_found() {
        let f = fixture();
        let owner = f.account("acme", Role::Employer, true);
        let intruder = f.account("globex", Role::Employer, true);
        let job = f.catalog.create_job(&owner, &job_form("Dev", "")).unwrap();

        assert!(matches!(
            f.catalog.edit_job(&intruder, job.id, &job_form("Hacked", "")),
            Err(CatalogError::NotFound)
        ));
        assert!(matches!(
            f.catalog.delete_job(&intruder, job.id),
            Err(CatalogError::NotFound)
        ));
        assert_eq!(
            f.catalog.job_detail(job.id, None).unwrap().listing.job.title,
            "Dev"
        );

        let edited = f
            .catalog
            .edit_job(&owner, job.id, &job_form("Senior Dev", "Closed"))
            .unwrap();
        assert_eq!(edited.title, "Senior Dev");
        assert_eq!(edited.status, JobStatus::Closed);
        f.catalog.delete_job(&owner, job.id).unwrap();
        assert!(matches!(
            f.catalog.job_detail(job.id, None),
            Err(CatalogError::NotFound)
        ));
    }

    #[test]
    fn ids_past_the_rowid_range_are_not_found() {
        let f = fixture();
        let employer = f.account("acme", Role::Employer, true);
        let seeker = f.account("sam", Role::JobSeeker, true);
        let huge = usize::MAX;

        assert!(matches!(
            f.catalog.job_detail(huge, Some(&seeker)),
            Err(CatalogError::NotFound)
        ));
        assert!(matches!(
            f.catalog.toggle_save(&seeker, huge),
            Err(CatalogError::NotFound)
        ));
        assert!(matches!(
            f.catalog.edit_job(&employer, huge, &job_form("Dev", "")),
            Err(CatalogError::NotFound)
        ));
        assert!(matches!(
            f.catalog.delete_job(&employer, huge),
            Err(CatalogError::NotFound)
        ));
        assert!(f.catalog.company_jobs(huge).unwrap().is_empty());
    }

    #[test]
    fn toggle_save_is_an_involution_on_open_jobs() {
        let f = fixture();
        let employer = f.account("acme", Role::Employer, true);
        let seeker = f.account("sam", Role::JobSeeker, false);
        let open = f.catalog.create_job(&employer, &job_form("Dev", "")).unwrap();
        let draft = f
            .catalog
            .create_job(&employer, &job_form("Later", "Draft"))
            .unwrap();

        assert!(f.catalog.toggle_save(&seeker, open.id).unwrap());
        assert!(f.catalog.job_detail(open.id, Some(&seeker)).unwrap().is_saved);
        assert!(!f.catalog.toggle_save(&seeker, open.id).unwrap());
        assert!(f.catalog.saved_jobs(&seeker).unwrap().is_empty());

        assert!(matches!(
            f.catalog.toggle_save(&seeker, draft.id),
            Err(CatalogError::NotFound)
        ));
    }

    #[test]
    fn search_flags_only_cover_seekers() {
        let f = fixture();
        let employer = f.account("acme", Role::Employer, true);
        let seeker = f.account("sam", Role::JobSeeker, true);
        let job = f.catalog.create_job(&employer, &job_form("Dev", "")).unwrap();
        f.catalog.toggle_save(&seeker, job.id).unwrap();
        f.applications
            .create_application(
                seeker.id(),
                job.id,
                &ApplicationFields {
                    qualification: "BSc".to_string(),
                    phone: "555".to_string(),
                    experience: String::new(),
                    cover_letter: None,
                    resume: None,
                },
                1,
            )
            .unwrap();

        let results = f
            .catalog
            .search(SearchParams::default(), Some(&seeker))
            .unwrap();
        assert_eq!(results.saved_job_ids, BTreeSet::from([job.id]));
        assert_eq!(results.applied_job_ids, BTreeSet::from([job.id]));
        assert_eq!(results.page.items[0].application_count, 1);

        let anonymous = f.catalog.search(SearchParams::default(), None).unwrap();
        assert!(anonymous.saved_job_ids.is_empty());
        let as_employer = f
            .catalog
            .search(SearchParams::default(), Some(&employer))
            .unwrap();
        assert!(as_employer.applied_job_ids.is_empty());
    }

    #[test]
    fn dashboards_are_role_gated() {
        let f = fixture();
        let employer = f.account("acme", Role::Employer, true);
        let seeker = f.account("sam", Role::JobSeeker, true);
        f.catalog.create_job(&employer, &job_form("A", "")).unwrap();
        f.catalog.create_job(&employer, &job_form("B", "Closed")).unwrap();
        f.catalog.create_job(&employer, &job_form("C", "Draft")).unwrap();

        let dashboard = f.catalog.employer_dashboard(&employer).unwrap();
        assert_eq!(dashboard.total_jobs, 3);
        assert_eq!(dashboard.open_jobs.len(), 1);
        assert_eq!(dashboard.closed_jobs.len(), 1);
        assert_eq!(dashboard.draft_jobs.len(), 1);
        assert_eq!(dashboard.total_applications, 0);

        assert!(matches!(
            f.catalog.employer_dashboard(&seeker),
            Err(CatalogError::EmployersOnly)
        ));
        assert!(matches!(
            f.catalog.seeker_dashboard(&employer),
            Err(CatalogError::JobSeekersOnly)
        ));

        let seeker_dashboard = f.catalog.seeker_dashboard(&seeker).unwrap();
        assert_eq!(seeker_dashboard.recommended_jobs.len(), 1);
        assert_eq!(seeker_dashboard.total_applications, 0);
    }
}
