//! Applying to jobs, the candidate's own applications and the employer's
//! applicant review.

use super::multipart::{MultipartForm, MAX_UPLOAD_REQUEST_BYTES};
use super::responses::{job_applications_path, job_detail_path, Redirect, MY_APPLICATIONS_PATH};
use super::session::Session;
use super::state::{GuardedApplicationWorkflow, ServerState};
use crate::applications::{ApplicationItem, ApplicationSort, WorkflowError};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct SortParam {
    sort: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct StatusUpdateBody {
    application_id: Option<usize>,
    status: Option<String>,
}

#[derive(Serialize)]
struct MyApplications {
    applications: Vec<ApplicationItem>,
    sort: ApplicationSort,
}

async fn apply(
    State(workflow): State<GuardedApplicationWorkflow>,
    session: Session,
    Path(job_id): Path<usize>,
    multipart: Multipart,
) -> Response {
    let form = match MultipartForm::read(multipart).await {
        Ok(form) => form.into_application_form(),
        Err(rejection) => return rejection.into_response(),
    };
    let job_page = job_detail_path(job_id);
    match workflow.apply(&session.account, job_id, &form) {
        Ok(_) => Redirect::success(job_page, "Application submitted.").into_response(),
        Err(err @ WorkflowError::AlreadyApplied) => {
            Redirect::info(job_page, err.to_string()).into_response()
        }
        Err(err @ (WorkflowError::EmployersCannotApply | WorkflowError::JobClosed)) => {
            Redirect::error(job_page, err.to_string()).into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn my_applications(
    State(workflow): State<GuardedApplicationWorkflow>,
    session: Session,
    Query(param): Query<SortParam>,
) -> Response {
    let sort = ApplicationSort::parse(param.sort.as_deref().unwrap_or_default());
    match workflow.my_applications(&session.account, sort) {
        Ok(applications) => Json(MyApplications { applications, sort }).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn edit_application(
    State(workflow): State<GuardedApplicationWorkflow>,
    session: Session,
    Path(application_id): Path<usize>,
    multipart: Multipart,
) -> Response {
    let form = match MultipartForm::read(multipart).await {
        Ok(form) => form.into_application_form(),
        Err(rejection) => return rejection.into_response(),
    };
    match workflow.edit(&session.account, application_id, &form) {
        Ok(_) => Redirect::success(MY_APPLICATIONS_PATH, "Application updated.").into_response(),
        Err(err) => err.into_response(),
    }
}

/// The application as stored, to fill in the edit form.
async fn get_application_for_edit(
    State(workflow): State<GuardedApplicationWorkflow>,
    session: Session,
    Path(application_id): Path<usize>,
) -> Response {
    match workflow.own_application(&session.account, application_id) {
        Ok(application) => Json(application).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn withdraw_application(
    State(workflow): State<GuardedApplicationWorkflow>,
    session: Session,
    Path(application_id): Path<usize>,
) -> Response {
    match workflow.withdraw(&session.account, application_id) {
        Ok(_) => Redirect::info(MY_APPLICATIONS_PATH, "Application withdrawn.").into_response(),
        Err(err) => err.into_response(),
    }
}

async fn job_applications(
    State(workflow): State<GuardedApplicationWorkflow>,
    session: Session,
    Path(job_id): Path<usize>,
) -> Response {
    match workflow.job_applications(&session.account, job_id) {
        Ok(applications) => Json(applications).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn update_application_status(
    State(workflow): State<GuardedApplicationWorkflow>,
    session: Session,
    Path(job_id): Path<usize>,
    Json(body): Json<StatusUpdateBody>,
) -> Response {
    let applicants_page = job_applications_path(job_id);
    let (Some(application_id), Some(status)) = (body.application_id, body.status) else {
        // Nothing to change, but the job must still be the caller's
        return match workflow.job_applications(&session.account, job_id) {
            Ok(_) => Redirect::to(applicants_page).into_response(),
            Err(err) => err.into_response(),
        };
    };

    match workflow.set_status(&session.account, job_id, application_id, &status) {
        Ok(update) => Redirect::success(
            applicants_page,
            format!(
                "Status updated to '{}' for {}.",
                update.applicant.application.status, update.applicant.username
            ),
        )
        .into_response(),
        Err(err @ (WorkflowError::InvalidStatus(_) | WorkflowError::TransitionDenied { .. })) => {
            Redirect::error(applicants_page, err.to_string()).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub fn make_application_routes(state: ServerState) -> Router {
    Router::new()
        .route(
            "/jobs/{id}/apply/",
            post(apply).layer(DefaultBodyLimit::max(MAX_UPLOAD_REQUEST_BYTES)),
        )
        .route(
            "/jobs/{id}/applications/",
            get(job_applications).post(update_application_status),
        )
        .route("/jobs/applications/", get(my_applications))
        .route(
            "/jobs/applications/{id}/edit/",
            get(get_application_for_edit)
                .post(edit_application)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_REQUEST_BYTES)),
        )
        .route("/jobs/applications/{id}/withdraw/", post(withdraw_application))
        .with_state(state)
}
