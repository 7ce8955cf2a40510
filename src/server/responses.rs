//! Response shapes shared by every route: redirects carrying a flash message,
//! form errors, and the mapping of service errors onto them.

use crate::applications::WorkflowError;
use crate::jobs::CatalogError;
use crate::server::metrics;
use crate::user::AccountError;
use crate::validation::FormErrors;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

pub const LOGIN_PATH: &str = "/accounts/login/";
pub const PROFILE_PATH: &str = "/accounts/profile/";
pub const JOB_LIST_PATH: &str = "/jobs/";
pub const EMPLOYER_DASHBOARD_PATH: &str = "/jobs/employer/dashboard/";
pub const MY_APPLICATIONS_PATH: &str = "/jobs/applications/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub text: String,
}

/// A 303 See Other, optionally telling the client what happened.
#[derive(Debug, Clone, Serialize)]
pub struct Redirect {
    #[serde(skip)]
    location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<Flash>,
}

impl Redirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: None,
        }
    }

    pub fn with(location: impl Into<String>, level: FlashLevel, text: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: Some(Flash {
                level,
                text: text.into(),
            }),
        }
    }

    pub fn success(location: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with(location, FlashLevel::Success, text)
    }

    pub fn info(location: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with(location, FlashLevel::Info, text)
    }

    pub fn warning(location: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with(location, FlashLevel::Warning, text)
    }

    pub fn error(location: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with(location, FlashLevel::Error, text)
    }
}

impl IntoResponse for Redirect {
    fn into_response(self) -> Response {
        let body = Json(&self).into_response();
        (
            StatusCode::SEE_OTHER,
            [(header::LOCATION, self.location)],
            body,
        )
            .into_response()
    }
}

pub fn job_detail_path(job_id: usize) -> String {
    format!("/jobs/{}/", job_id)
}

pub fn job_applications_path(job_id: usize) -> String {
    format!("/jobs/{}/applications/", job_id)
}

pub fn form_errors_response(errors: &FormErrors) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "errors": errors.messages() })),
    )
        .into_response()
}

pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}

pub fn internal_error(err: &anyhow::Error) -> Response {
    error!("Request failed: {:#}", err);
    metrics::record_error("internal", "store");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let text = self.to_string();
        match self {
            AccountError::Invalid(errors) => form_errors_response(&errors),
            AccountError::InvalidCredentials => {
                (StatusCode::FORBIDDEN, Json(json!({ "error": text }))).into_response()
            }
            AccountError::InvalidActivationLink => Redirect::error(LOGIN_PATH, text).into_response(),
            AccountError::NotFound => not_found(),
            AccountError::Store(err) => internal_error(&err),
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let text = self.to_string();
        match self {
            CatalogError::EmployersOnly => Redirect::to(JOB_LIST_PATH).into_response(),
            CatalogError::JobSeekersOnly => Redirect::to(EMPLOYER_DASHBOARD_PATH).into_response(),
            CatalogError::EmailNotVerified => Redirect::warning(PROFILE_PATH, text).into_response(),
            CatalogError::NotFound => not_found(),
            CatalogError::Invalid(errors) => form_errors_response(&errors),
            CatalogError::Store(err) => internal_error(&err),
        }
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let text = self.to_string();
        match self {
            WorkflowError::EmailNotVerified => Redirect::warning(PROFILE_PATH, text).into_response(),
            WorkflowError::EmployersOnly => Redirect::to(JOB_LIST_PATH).into_response(),
            WorkflowError::EmployersCannotApply | WorkflowError::JobClosed => {
                Redirect::error(JOB_LIST_PATH, text).into_response()
            }
            WorkflowError::AlreadyApplied => Redirect::info(MY_APPLICATIONS_PATH, text).into_response(),
            WorkflowError::EditWindowClosed | WorkflowError::WithdrawWindowClosed => {
                Redirect::info(MY_APPLICATIONS_PATH, text).into_response()
            }
            WorkflowError::InvalidStatus(_) | WorkflowError::TransitionDenied { .. } => {
                Redirect::error(JOB_LIST_PATH, text).into_response()
            }
            WorkflowError::NotFound => not_found(),
            WorkflowError::Invalid(errors) => form_errors_response(&errors),
            WorkflowError::Store(err) => internal_error(&err),
        }
    }
}
