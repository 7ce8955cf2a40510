use super::auth::HashedPassword;
use super::profile::{Profile, Role};
use crate::validation::{FieldError, FormErrors};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
}

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: usize,
    pub username: String,
    pub email: String,
    pub created: i64,
    pub last_login: Option<i64>,
}

/// A user together with its profile, as resolved from a session.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub user: User,
    pub profile: Profile,
}

impl Account {
    pub fn id(&self) -> usize {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.profile.role()
    }

    /// Where the user lands after logging in.
    pub fn landing_page(&self) -> &'static str {
        match self.role() {
            Role::Employer => "/jobs/employer/dashboard/",
            Role::JobSeeker => "/jobs/dashboard/",
        }
    }
}

/// Everything needed to insert a user, its profile and its password at once.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub password: HashedPassword,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub role: Option<String>,
}

/// A registration form that passed validation, except for username uniqueness
/// which needs the store.
#[derive(Debug, Clone)]
pub struct ValidRegistration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<ValidRegistration, FormErrors> {
        let mut errors = FormErrors::new();

        let username = errors.required("username", &self.username, 150);
        if !username.is_empty() && !USERNAME_RE.is_match(&username) {
            errors.add("username", FieldError::InvalidFormat { expected: "username" });
        }

        let email = errors.required("email", &self.email, 254);
        if !email.is_empty() && email.parse::<lettre::Address>().is_err() {
            errors.add("email", FieldError::InvalidFormat { expected: "email address" });
        }

        if self.password.is_empty() {
            errors.add("password", FieldError::Required);
        } else {
            for reason in password_weaknesses(&self.password, &username) {
                errors.add("password", FieldError::TooWeak { reason });
            }
        }
        if self.password != self.password_confirmation {
            errors.add("password_confirmation", FieldError::Mismatch);
        }

        let role = match self.role.as_deref().map(str::trim) {
            None | Some("") => Some(Role::JobSeeker),
            Some(value) => match value.parse::<Role>() {
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

        errors.into_result()?;
        Ok(ValidRegistration {
            username,
            email,
            password: self.password.clone(),
            role: role.unwrap_or(Role::JobSeeker),
        })
    }
}

fn password_weaknesses(password: &str, username: &str) -> Vec<&'static str> {
    let mut reasons = vec![];
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        reasons.push("it must contain at least 8 characters");
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        reasons.push("it is entirely numeric");
    }
    if !username.is_empty() && password.eq_ignore_ascii_case(username) {
        reasons.push("it is too similar to the username");
    }
    reasons
}
