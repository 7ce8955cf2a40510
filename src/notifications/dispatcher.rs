//! Application lifecycle notifier.
//!
//! Turns application events into in-app notifications and emails. Every
//! side effect is best effort: a failure is logged and the remaining ones
//! still run, the caller never learns about it.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::applications::{Application, ApplicationEvent, ApplicationStatus};
use crate::clock::Clock;
use crate::jobs::{Job, JobStore};
use crate::mail::{Mailer, OutgoingEmail};
use crate::server::metrics;
use crate::user::{FullUserStore, User};

/// Receives the events published by the application workflow.
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, event: &ApplicationEvent);
}

/// Notifies employers about new applications and candidates about their
/// submission and every status change.
pub struct MailingNotificationDispatcher {
    user_store: Arc<dyn FullUserStore>,
    job_store: Arc<dyn JobStore>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
}

impl MailingNotificationDispatcher {
    pub fn new(
        user_store: Arc<dyn FullUserStore>,
        job_store: Arc<dyn JobStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user_store,
            job_store,
            mailer,
            clock,
        }
    }

    /// Loads the job and the candidate an event is about.
    fn context(&self, application: &Application) -> Option<(Job, User)> {
        let job = match self.job_store.get_job(application.job_id) {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!("Job {} of application {} is gone", application.job_id, application.id);
                return None;
            }
            Err(e) => {
                warn!("Failed to load job {}: {}", application.job_id, e);
                return None;
            }
        };
        match self.user_store.get_user(application.user_id) {
            Ok(Some(candidate)) => Some((job, candidate)),
            Ok(None) => {
                warn!("Candidate {} of application {} is gone", application.user_id, application.id);
                None
            }
            Err(e) => {
                warn!("Failed to load user {}: {}", application.user_id, e);
                None
            }
        }
    }

    fn notify(&self, user_id: usize, message: &str) {
        match self
            .user_store
            .create_notification(user_id, message, self.clock.now())
        {
            Ok(_) => metrics::record_notification_created(),
            Err(e) => warn!("Failed to create notification for user {}: {}", user_id, e),
        }
    }

    /// Mails `to`, unless the recipient has no address.
    fn email(&self, to: &str, subject: String, body: String) {
        if to.trim().is_empty() {
            debug!("Skipping email {:?}, recipient has no address", subject);
            return;
        }
        let email = OutgoingEmail {
            to: to.to_string(),
            subject,
            body,
        };
        if let Err(e) = self.mailer.send(email) {
            warn!("Failed to send email to {}: {}", to, e);
            metrics::record_email("failed");
        }
    }

    fn application_created(&self, application: &Application) {
        let Some((job, candidate)) = self.context(application) else {
            return;
        };

        match self.user_store.get_user(job.employer_id) {
            Ok(Some(employer)) => {
                self.email(
                    &employer.email,
                    format!("New application for {}", job.title),
                    format!(
                        "You have received a new application for your job '{}'.\n\n\
                         Candidate: {}\nStatus: {}\n\n\
                         Please log in to your employer dashboard to review this application.",
                        job.title, candidate.username, application.status
                    ),
                );
                self.notify(
                    employer.id,
                    &format!(
                        "New application from {} for {}",
                        candidate.username, job.title
                    ),
                );
            }
            Ok(None) => warn!("Employer {} of job {} is gone", job.employer_id, job.id),
            Err(e) => warn!("Failed to load employer {}: {}", job.employer_id, e),
        }

        self.notify(
            candidate.id,
            &format!("Your application for {} has been submitted.", job.title),
        );
    }

    fn status_changed(
        &self,
        application: &Application,
        old: ApplicationStatus,
        new: ApplicationStatus,
    ) {
        if old == new {
            return;
        }
        let Some((job, candidate)) = self.context(application) else {
            return;
        };

        self.email(
            &candidate.email,
            format!("Your application status for {} has changed", job.title),
            format!(
                "Hi {},\n\nThe status of your application for '{}' has changed to: {}. \
                 (previously: {})\n\nPlease log in to your dashboard for more details.",
                candidate.username, job.title, new, old
            ),
        );
        self.notify(
            candidate.id,
            &format!(
                "Your application for {} is now '{}' (previously '{}').",
                job.title, new, old
            ),
        );
    }
}

impl NotificationDispatcher for MailingNotificationDispatcher {
    fn dispatch(&self, event: &ApplicationEvent) {
        match event {
            ApplicationEvent::Created { application } => self.application_created(application),
            ApplicationEvent::StatusChanged {
                application,
                old,
                new,
            } => self.status_changed(application, *old, *new),
        }
    }
}
