//! The application lifecycle: candidates apply, edit and withdraw, employers
//! move applications along the review pipeline.

use super::models::{
    Applicant, Application, ApplicationEvent, ApplicationFields, ApplicationForm,
    ApplicationSort, ApplicationStatus, CandidateApplication, Transition,
};
use super::store::ApplicationStore;
use crate::clock::Clock;
use crate::jobs::{Job, JobStore};
use crate::notifications::NotificationDispatcher;
use crate::server::metrics;
use crate::uploads::{check_upload, FileStorage, UploadKind};
use crate::user::{Account, Role};
use crate::validation::FormErrors;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Employers cannot apply to jobs.")]
    EmployersCannotApply,

    #[error("Please verify your email before applying to jobs.")]
    EmailNotVerified,

    #[error("You have already applied to this job.")]
    AlreadyApplied,

    #[error("This job is no longer accepting applications.")]
    JobClosed,

    #[error("Only employers can review applications.")]
    EmployersOnly,

    #[error("This application can no longer be edited.")]
    EditWindowClosed,

    #[error("This application can no longer be withdrawn.")]
    WithdrawWindowClosed,

    #[error("'{0}' is not a status you can set.")]
    InvalidStatus(String),

    #[error("Cannot move an application from '{from}' to '{to}'.")]
    TransitionDenied {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Invalid(#[from] FormErrors),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// A row of the candidate's application list.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationItem {
    #[serde(flatten)]
    pub entry: CandidateApplication,
    pub can_modify: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobApplications {
    pub job: Job,
    pub applicants: Vec<Applicant>,
    pub status_choices: Vec<ApplicationStatus>,
}

/// Result of an employer status update.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub applicant: Applicant,
    pub previous: ApplicationStatus,
    pub changed: bool,
}

pub struct ApplicationWorkflow {
    applications: Arc<dyn ApplicationStore>,
    jobs: Arc<dyn JobStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    storage: Arc<dyn FileStorage>,
    clock: Arc<dyn Clock>,
}

impl ApplicationWorkflow {
    pub fn new(
        applications: Arc<dyn ApplicationStore>,
        jobs: Arc<dyn JobStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        storage: Arc<dyn FileStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            applications,
            jobs,
            dispatcher,
            storage,
            clock,
        }
    }

    /// Validates the form and stores its resume, if any.
    fn accept_form(&self, form: &ApplicationForm) -> Result<ApplicationFields, WorkflowError> {
        let mut errors = FormErrors::new();
        let resume = check_upload(
            &mut errors,
            "resume",
            UploadKind::ApplicationResume,
            form.resume.as_ref(),
        );
        let fields = match form.validate(None) {
            Ok(fields) => fields,
            Err(form_errors) => {
                errors.merge(form_errors);
                return Err(errors.into());
            }
        };
        errors.into_result()?;

        let resume = resume
            .map(|upload| upload.store(self.storage.as_ref()))
            .transpose()?;
        Ok(ApplicationFields { resume, ..fields })
    }

    pub fn apply(
        &self,
        account: &Account,
        job_id: usize,
        form: &ApplicationForm,
    ) -> Result<Application, WorkflowError> {
        let job = self.jobs.get_job(job_id)?.ok_or(WorkflowError::NotFound)?;
        if account.role() == Role::Employer {
            return Err(WorkflowError::EmployersCannotApply);
        }
        if !account.profile.email_verified {
            return Err(WorkflowError::EmailNotVerified);
        }
        if self
            .applications
            .get_user_application(account.id(), job.id)?
            .is_some()
        {
            return Err(WorkflowError::AlreadyApplied);
        }
        if !job.is_open() {
            return Err(WorkflowError::JobClosed);
        }

        let fields = self.accept_form(form)?;
        let application = self
            .applications
            .create_application(account.id(), job.id, &fields, self.clock.now())?
            .ok_or(WorkflowError::AlreadyApplied)?;
        info!(
            "User {} applied to job {} (application {})",
            account.id(),
            job.id,
            application.id
        );
        metrics::record_application_submitted();

        self.dispatcher.dispatch(&ApplicationEvent::Created {
            application: application.clone(),
        });
        Ok(application)
    }

    /// The caller's own application, NotFound for anybody else's.
    pub fn own_application(
        &self,
        account: &Account,
        application_id: usize,
    ) -> Result<Application, WorkflowError> {
        self.applications
            .get_application(application_id)?
            .filter(|application| application.user_id == account.id())
            .ok_or(WorkflowError::NotFound)
    }

    /// Rewrites the editable fields in place, keeping status and timestamp.
    pub fn edit(
        &self,
        account: &Account,
        application_id: usize,
        form: &ApplicationForm,
    ) -> Result<Application, WorkflowError> {
        let application = self.own_application(account, application_id)?;
        if !application.can_be_modified(self.clock.now()) {
            return Err(WorkflowError::EditWindowClosed);
        }
        let fields = self.accept_form(form)?;
        self.applications
            .update_application_fields(application.id, &fields)?;
        self.applications
            .get_application(application.id)?
            .ok_or(WorkflowError::NotFound)
    }

    /// Withdraws the application. Nobody is notified.
    pub fn withdraw(
        &self,
        account: &Account,
        application_id: usize,
    ) -> Result<Application, WorkflowError> {
        let application = self.own_application(account, application_id)?;
        if !application.can_be_modified(self.clock.now()) {
            return Err(WorkflowError::WithdrawWindowClosed);
        }
        self.applications
            .set_application_status(application.id, ApplicationStatus::Withdrawn)?;
        info!("Application {} withdrawn by its candidate", application.id);
        Ok(Application {
            status: ApplicationStatus::Withdrawn,
            ..application
        })
    }

    pub fn my_applications(
        &self,
        account: &Account,
        sort: ApplicationSort,
    ) -> Result<Vec<ApplicationItem>, WorkflowError> {
        let now = self.clock.now();
        Ok(self
            .applications
            .applications_of_user(account.id(), sort, None)?
            .into_iter()
            .map(|entry| ApplicationItem {
                can_modify: entry.application.can_be_modified(now),
                entry,
            })
            .collect())
    }

    fn owned_job(&self, account: &Account, job_id: usize) -> Result<Job, WorkflowError> {
        if account.role() != Role::Employer {
            return Err(WorkflowError::EmployersOnly);
        }
        self.jobs
            .get_employer_job(job_id, account.id())?
            .ok_or(WorkflowError::NotFound)
    }

    pub fn job_applications(
        &self,
        account: &Account,
        job_id: usize,
    ) -> Result<JobApplications, WorkflowError> {
        let job = self.owned_job(account, job_id)?;
        let applicants = self.applications.applicants_of_job(job.id)?;
        Ok(JobApplications {
            job,
            applicants,
            status_choices: ApplicationStatus::employer_choices(),
        })
    }

    /// Moves an application of one of the employer's jobs to `status`,
    /// following the transition table.
    pub fn set_status(
        &self,
        account: &Account,
        job_id: usize,
        application_id: usize,
        status: &str,
    ) -> Result<StatusUpdate, WorkflowError> {
        let job = self.owned_job(account, job_id)?;
        let applicant = self
            .applications
            .get_applicant(application_id)?
            .filter(|applicant| applicant.application.job_id == job.id)
            .ok_or(WorkflowError::NotFound)?;

        let new = status
            .trim()
            .parse::<ApplicationStatus>()
            .ok()
            .filter(|status| *status != ApplicationStatus::Withdrawn)
            .ok_or_else(|| WorkflowError::InvalidStatus(status.to_string()))?;
        let old = applicant.application.status;

        match old.employer_transition(new) {
            Transition::Unchanged => {
                debug!("Application {} already {}", application_id, old);
                return Ok(StatusUpdate {
                    applicant,
                    previous: old,
                    changed: false,
                });
            }
            Transition::Denied => return Err(WorkflowError::TransitionDenied { from: old, to: new }),
            Transition::Allowed => {}
        }

        self.applications
            .set_application_status(application_id, new)?;
        let applicant = self
            .applications
            .get_applicant(application_id)?
            .ok_or(WorkflowError::NotFound)?;
        let stored = applicant.application.status;
        info!(
            "Application {} moved from {} to {} by employer {}",
            application_id,
            old,
            stored,
            account.id()
        );

        let changed = stored != old;
        if changed {
            metrics::record_status_change(stored.as_str());
            self.dispatcher.dispatch(&ApplicationEvent::StatusChanged {
                application: applicant.application.clone(),
                old,
                new: stored,
            });
        }
        Ok(StatusUpdate {
            applicant,
            previous: old,
            changed,
        })
    }
}
