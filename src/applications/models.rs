use crate::jobs::Job;
use crate::uploads::UploadedFile;
use crate::validation::FormErrors;
use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// How long after applying a candidate may still edit or withdraw.
pub const EDIT_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Applied,
    #[serde(rename = "Under Review")]
    UnderReview,
    Shortlisted,
    Interview,
    Rejected,
    Hired,
    Withdrawn,
}

/// Outcome of looking up an employer status change in the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Same status, nothing to write.
    Unchanged,
    Allowed,
    Denied,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 7] = [
        ApplicationStatus::Applied,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Interview,
        ApplicationStatus::Rejected,
        ApplicationStatus::Hired,
        ApplicationStatus::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::UnderReview => "Under Review",
            ApplicationStatus::Shortlisted => "Shortlisted",
            ApplicationStatus::Interview => "Interview",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::Hired => "Hired",
            ApplicationStatus::Withdrawn => "Withdrawn",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Rejected | ApplicationStatus::Hired | ApplicationStatus::Withdrawn
        )
    }

    /// Every status but Withdrawn, which only the candidate can reach.
    pub fn employer_choices() -> Vec<ApplicationStatus> {
        Self::ALL
            .into_iter()
            .filter(|status| *status != ApplicationStatus::Withdrawn)
            .collect()
    }

    /// Position along the review pipeline, None for terminal statuses.
    fn pipeline_rank(&self) -> Option<u8> {
        match self {
            ApplicationStatus::Applied => Some(0),
            ApplicationStatus::UnderReview => Some(1),
            ApplicationStatus::Shortlisted => Some(2),
            ApplicationStatus::Interview => Some(3),
            _ => None,
        }
    }

    /// The employer transition table.
    pub fn employer_transition(&self, to: ApplicationStatus) -> Transition {
        if *self == to {
            return Transition::Unchanged;
        }
        match (self.pipeline_rank(), to) {
            (None, _) | (_, ApplicationStatus::Withdrawn) => Transition::Denied,
            (Some(_), ApplicationStatus::Rejected | ApplicationStatus::Hired) => Transition::Allowed,
            (Some(from), to) => match to.pipeline_rank() {
                Some(rank) if rank > from => Transition::Allowed,
                _ => Transition::Denied,
            },
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match Self::ALL.iter().find(|status| status.as_str() == s) {
            Some(status) => Ok(*status),
            None => bail!("Unknown application status {}", s),
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
    pub id: usize,
    pub user_id: usize,
    pub job_id: usize,
    pub cover_letter: Option<String>,
    pub resume: Option<String>,
    pub qualification: String,
    pub phone: String,
    pub experience: String,
    pub status: ApplicationStatus,
    pub applied_at: i64,
}

impl Application {
    /// Whether the candidate may still edit or withdraw at `now`.
    pub fn can_be_modified(&self, now: i64) -> bool {
        now - self.applied_at <= EDIT_WINDOW.as_secs() as i64 && !self.status.is_terminal()
    }
}

/// The candidate-editable part of an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationFields {
    pub qualification: String,
    pub phone: String,
    pub experience: String,
    pub cover_letter: Option<String>,
    /// New resume path, None keeps the current one.
    pub resume: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApplicationForm {
    pub qualification: String,
    pub phone: String,
    pub experience: String,
    pub cover_letter: String,
    #[serde(skip)]
    pub resume: Option<UploadedFile>,
}

impl ApplicationForm {
    /// Validates the text fields. The resume, if any, is checked and stored by
    /// the caller, which passes its stored path in.
    pub fn validate(&self, resume: Option<String>) -> Result<ApplicationFields, FormErrors> {
        let mut errors = FormErrors::new();
        let qualification = errors.required("qualification", &self.qualification, 120);
        let phone = errors.required("phone", &self.phone, 20);
        let experience = errors.optional("experience", &self.experience, 100);
        let cover_letter = self.cover_letter.trim().to_string();
        errors.into_result()?;
        Ok(ApplicationFields {
            qualification,
            phone,
            experience,
            cover_letter: Some(cover_letter).filter(|c| !c.is_empty()),
            resume,
        })
    }
}

/// An application together with its job, as listed to the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateApplication {
    #[serde(flatten)]
    pub application: Application,
    pub job: Job,
}

/// An application as listed to the employer reviewing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Applicant {
    #[serde(flatten)]
    pub application: Application,
    pub username: String,
    pub email: String,
}

/// Ordering of the candidate's application list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationSort {
    /// Newest first.
    #[default]
    Recent,
    /// By status name, then newest first.
    Status,
}

impl ApplicationSort {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "status" => ApplicationSort::Status,
            _ => ApplicationSort::Recent,
        }
    }
}

/// Something that happened to an application and may interest other people.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationEvent {
    Created {
        application: Application,
    },
    StatusChanged {
        application: Application,
        old: ApplicationStatus,
        new: ApplicationStatus,
    },
}
