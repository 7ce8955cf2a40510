//! Per-user profile: contact details plus the attributes of the user's role.

use crate::uploads::UploadedFile;
use crate::validation::{FieldError, FormErrors};
use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    JobSeeker,
    Employer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::JobSeeker => "jobseeker",
            Role::Employer => "employer",
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "jobseeker" => Ok(Role::JobSeeker),
            "employer" => Ok(Role::Employer),
            _ => bail!("Unknown role {}", s),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes that only make sense for one of the two roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum RoleProfile {
    JobSeeker {
        resume: Option<String>,
    },
    Employer {
        company_name: String,
        company_website: String,
        company_logo: Option<String>,
        company_description: Option<String>,
    },
}

impl RoleProfile {
    pub fn empty(role: Role) -> Self {
        match role {
            Role::JobSeeker => RoleProfile::JobSeeker { resume: None },
            Role::Employer => RoleProfile::Employer {
                company_name: String::new(),
                company_website: String::new(),
                company_logo: None,
                company_description: None,
            },
        }
    }

    pub fn role(&self) -> Role {
        match self {
            RoleProfile::JobSeeker { .. } => Role::JobSeeker,
            RoleProfile::Employer { .. } => Role::Employer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub user_id: usize,
    pub full_name: String,
    pub phone: String,
    pub location: String,
    pub email_verified: bool,
    #[serde(flatten)]
    pub role_profile: RoleProfile,
}

impl Profile {
    pub fn new(user_id: usize, role: Role) -> Self {
        Self {
            user_id,
            full_name: String::new(),
            phone: String::new(),
            location: String::new(),
            email_verified: false,
            role_profile: RoleProfile::empty(role),
        }
    }

    pub fn role(&self) -> Role {
        self.role_profile.role()
    }

    pub fn is_employer(&self) -> bool {
        self.role() == Role::Employer
    }

    pub fn company_name(&self) -> Option<&str> {
        match &self.role_profile {
            RoleProfile::Employer { company_name, .. } => Some(company_name),
            RoleProfile::JobSeeker { .. } => None,
        }
    }

    /// Sets the stored path of a newly uploaded file, when the role has such a field.
    pub fn attach_upload(&mut self, resume: Option<String>, company_logo: Option<String>) {
        match &mut self.role_profile {
            RoleProfile::JobSeeker { resume: current } => {
                if resume.is_some() {
                    *current = resume;
                }
            }
            RoleProfile::Employer {
                company_logo: current,
                ..
            } => {
                if company_logo.is_some() {
                    *current = company_logo;
                }
            }
        }
    }

    /// The public company card of an employer, None for job seekers.
    pub fn as_company(&self) -> Option<Company> {
        match &self.role_profile {
            RoleProfile::Employer {
                company_name,
                company_website,
                company_logo,
                company_description,
            } => Some(Company {
                employer_id: self.user_id,
                company_name: company_name.clone(),
                company_website: company_website.clone(),
                company_logo: company_logo.clone(),
                company_description: company_description.clone(),
                location: self.location.clone(),
            }),
            RoleProfile::JobSeeker { .. } => None,
        }
    }
}

/// An employer as shown in the public company directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Company {
    pub employer_id: usize,
    pub company_name: String,
    pub company_website: String,
    pub company_logo: Option<String>,
    pub company_description: Option<String>,
    pub location: String,
}

/// The profile edit form. Text fields left out of the submission are blank,
/// files left out keep their current value.
/// Uploaded files are validated and stored separately, see [`Profile::attach_upload`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub role: String,
    pub full_name: String,
    pub phone: String,
    pub location: String,
    pub company_name: String,
    pub company_website: String,
    pub company_description: String,
    #[serde(skip)]
    pub resume: Option<UploadedFile>,
    #[serde(skip)]
    pub company_logo: Option<UploadedFile>,
}

/// An absolute http(s) URL with a host, as typed by the user.
fn is_valid_url(value: &str) -> bool {
    if value.contains(char::is_whitespace) {
        return false;
    }
    let Ok(url) = Url::parse(value) else {
        return false;
    };
    let host = url.host_str().unwrap_or_default().trim_end_matches('.');
    matches!(url.scheme(), "http" | "https")
        && !host.is_empty()
        && host.split('.').all(|label| !label.is_empty())
}

impl ProfileForm {
    /// Validates the form and applies it on top of `current`.
    pub fn apply(&self, current: &Profile) -> Result<Profile, FormErrors> {
        let mut errors = FormErrors::new();

        let role = match self.role.trim() {
            "" => {
                errors.add("role", FieldError::Required);
                None
            }
            value => match value.parse::<Role>() {
                Ok(role) => Some(role),
                Err(_) => {
                    errors.add(
                        "role",
                        FieldError::InvalidChoice {
                            value: value.to_string(),
                        },
                    );
                    None
                }
            },
        };
        let full_name = errors.optional("full_name", &self.full_name, 100);
        let phone = errors.optional("phone", &self.phone, 20);
        let location = errors.optional("location", &self.location, 100);
        let company_name = errors.optional("company_name", &self.company_name, 200);
        let company_website = errors.optional("company_website", &self.company_website, 200);
        if !company_website.is_empty() && !is_valid_url(&company_website) {
            errors.add("company_website", FieldError::InvalidFormat { expected: "URL" });
        }
        let company_description = self.company_description.trim().to_string();

        let role = match (role, errors.into_result()) {
            (Some(role), Ok(())) => role,
            (_, Err(errors)) => return Err(errors),
            (None, Ok(())) => return Err(FormErrors::single("role", FieldError::Required)),
        };

        let role_profile = match (role, &current.role_profile) {
            (Role::JobSeeker, RoleProfile::JobSeeker { resume }) => RoleProfile::JobSeeker {
                resume: resume.clone(),
            },
            (Role::JobSeeker, RoleProfile::Employer { .. }) => RoleProfile::JobSeeker { resume: None },
            (Role::Employer, current_role_profile) => {
                let current_logo = match current_role_profile {
                    RoleProfile::Employer { company_logo, .. } => company_logo.clone(),
                    RoleProfile::JobSeeker { .. } => None,
                };
                RoleProfile::Employer {
                    company_name,
                    company_website,
                    company_logo: current_logo,
                    company_description: Some(company_description).filter(|d| !d.is_empty()),
                }
            }
        };

        Ok(Profile {
            user_id: current.user_id,
            full_name,
            phone,
            location,
            email_verified: current.email_verified,
            role_profile,
        })
    }
}
