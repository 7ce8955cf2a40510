use crate::validation::{FieldError, FormErrors};
use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobType {
    #[serde(rename = "Full-Time")]
    FullTime,
    #[serde(rename = "Part-Time")]
    PartTime,
    Internship,
    Remote,
}

impl JobType {
    pub const ALL: [JobType; 4] = [
        JobType::FullTime,
        JobType::PartTime,
        JobType::Internship,
        JobType::Remote,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "Full-Time",
            JobType::PartTime => "Part-Time",
            JobType::Internship => "Internship",
            JobType::Remote => "Remote",
        }
    }
}

impl FromStr for JobType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match JobType::ALL.iter().find(|job_type| job_type.as_str() == s) {
            Some(job_type) => Ok(*job_type),
            None => bail!("Unknown job type {}", s),
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Open,
    Closed,
    Draft,
}

impl JobStatus {
    pub const ALL: [JobStatus; 3] = [JobStatus::Open, JobStatus::Closed, JobStatus::Draft];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Open => "Open",
            JobStatus::Closed => "Closed",
            JobStatus::Draft => "Draft",
        }
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match JobStatus::ALL.iter().find(|status| status.as_str() == s) {
            Some(status) => Ok(*status),
            None => bail!("Unknown job status {}", s),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub id: usize,
    pub employer_id: usize,
    pub title: String,
    pub company: String,
    pub description: String,
    pub location: String,
    pub salary: Option<String>,
    pub category: String,
    pub job_type: JobType,
    pub status: JobStatus,
    pub posted_at: i64,
}

impl Job {
    pub fn is_open(&self) -> bool {
        self.status == JobStatus::Open
    }
}

/// A job annotated with its live application count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobListing {
    #[serde(flatten)]
    pub job: Job,
    pub application_count: usize,
}

/// A bookmarked job, as listed to the user who saved it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedJob {
    pub job: Job,
    pub saved_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyPostings {
    /// `YYYY-MM`
    pub month: String,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobApplicationCount {
    pub job_id: usize,
    pub title: String,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryApplicationCount {
    pub category: String,
    pub total: usize,
}

/// Aggregates over the jobs of one employer. Jobs and categories without
/// applications do not appear in the application counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmployerAnalytics {
    pub jobs_per_month: Vec<MonthlyPostings>,
    pub applications_per_job: Vec<JobApplicationCount>,
    pub applications_per_category: Vec<CategoryApplicationCount>,
}

/// The job create/edit form. Missing fields are blank.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobForm {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub category: String,
    pub job_type: String,
    pub description: String,
    pub status: String,
}

/// The editable part of a job, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFields {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub category: String,
    pub job_type: JobType,
    pub description: String,
    pub status: JobStatus,
}

fn parse_choice<T: FromStr>(
    errors: &mut FormErrors,
    field: &'static str,
    value: &str,
    default: T,
) -> Option<T> {
    match value.trim() {
        "" => Some(default),
        value => match value.parse() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                errors.add(
                    field,
                    FieldError::InvalidChoice {
                        value: value.to_string(),
                    },
                );
                None
            }
        },
    }
}

impl JobForm {
    pub fn validate(&self) -> Result<JobFields, FormErrors> {
        let mut errors = FormErrors::new();
        let title = errors.required("title", &self.title, 200);
        let company = errors.required("company", &self.company, 200);
        let location = errors.required("location", &self.location, 100);
        let salary = errors.optional("salary", &self.salary, 50);
        let category = errors.required("category", &self.category, 100);
        let description = errors.required("description", &self.description, usize::MAX);
        let job_type = parse_choice(&mut errors, "job_type", &self.job_type, JobType::FullTime);
        let status = parse_choice(&mut errors, "status", &self.status, JobStatus::Open);
        errors.into_result()?;

        match (job_type, status) {
            (Some(job_type), Some(status)) => Ok(JobFields {
                title,
                company,
                location,
                salary: Some(salary).filter(|s| !s.is_empty()),
                category,
                job_type,
                description,
                status,
            }),
            _ => Err(FormErrors::single("job_type", FieldError::Required)),
        }
    }
}
