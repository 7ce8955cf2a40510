//! The job catalog: home page, search, job pages, posting and bookmarking,
//! dashboards and the company directory.

use super::account_routes::safe_next;
use super::responses::{job_detail_path, Redirect, EMPLOYER_DASHBOARD_PATH, JOB_LIST_PATH};
use super::session::Session;
use super::state::{GuardedJobCatalog, GuardedUserManager, ServerState};
use crate::jobs::{JobForm, JobListing, SearchParams};
use crate::user::Company;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct NextParam {
    next: Option<String>,
}

#[derive(Serialize)]
struct CompanyPage {
    company: Company,
    jobs: Vec<JobListing>,
}

async fn home(State(catalog): State<GuardedJobCatalog>) -> Response {
    match catalog.home() {
        Ok(page) => Json(page).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn search_jobs(
    State(catalog): State<GuardedJobCatalog>,
    session: Option<Session>,
    Query(params): Query<SearchParams>,
) -> Response {
    let viewer = session.as_ref().map(|s| &s.account);
    match catalog.search(params, viewer) {
        Ok(results) => Json(results).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_job(
    State(catalog): State<GuardedJobCatalog>,
    session: Option<Session>,
    Path(job_id): Path<usize>,
) -> Response {
    let viewer = session.as_ref().map(|s| &s.account);
    match catalog.job_detail(job_id, viewer) {
        Ok(detail) => Json(detail).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn seeker_dashboard(State(catalog): State<GuardedJobCatalog>, session: Session) -> Response {
    match catalog.seeker_dashboard(&session.account) {
        Ok(dashboard) => Json(dashboard).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn employer_dashboard(
    State(catalog): State<GuardedJobCatalog>,
    session: Session,
) -> Response {
    match catalog.employer_dashboard(&session.account) {
        Ok(dashboard) => Json(dashboard).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn create_job(
    State(catalog): State<GuardedJobCatalog>,
    session: Session,
    Json(form): Json<JobForm>,
) -> Response {
    match catalog.create_job(&session.account, &form) {
        Ok(job) => Redirect::to(job_detail_path(job.id)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// The job as stored, to fill in the edit form.
async fn get_job_for_edit(
    State(catalog): State<GuardedJobCatalog>,
    session: Session,
    Path(job_id): Path<usize>,
) -> Response {
    match catalog.employer_job(&session.account, job_id) {
        Ok(job) => Json(job).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn edit_job(
    State(catalog): State<GuardedJobCatalog>,
    session: Session,
    Path(job_id): Path<usize>,
    Json(form): Json<JobForm>,
) -> Response {
    match catalog.edit_job(&session.account, job_id, &form) {
        Ok(job) => Redirect::success(job_detail_path(job.id), "Job updated.").into_response(),
        Err(err) => err.into_response(),
    }
}

async fn delete_job(
    State(catalog): State<GuardedJobCatalog>,
    session: Session,
    Path(job_id): Path<usize>,
) -> Response {
    match catalog.delete_job(&session.account, job_id) {
        Ok(()) => Redirect::info(EMPLOYER_DASHBOARD_PATH, "Job deleted.").into_response(),
        Err(err) => err.into_response(),
    }
}

/// The path and query of a Referer pointing at this host. Referers from
/// other origins are dropped.
fn same_site_referer(headers: &HeaderMap) -> Option<String> {
    let referer = headers.get(header::REFERER)?.to_str().ok()?;
    if let Some(local) = safe_next(Some(referer)) {
        return Some(local);
    }

    let url = Url::parse(referer).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let origin = match url.port() {
        Some(port) => format!("{}:{}", url.host_str()?, port),
        None => url.host_str()?.to_string(),
    };
    let host = headers.get(header::HOST)?.to_str().ok()?;
    if !origin.eq_ignore_ascii_case(host) {
        return None;
    }

    let mut local = url.path().to_string();
    if let Some(query) = url.query() {
        local.push('?');
        local.push_str(query);
    }
    Some(local)
}

async fn toggle_save(
    State(catalog): State<GuardedJobCatalog>,
    session: Session,
    Path(job_id): Path<usize>,
    Query(param): Query<NextParam>,
    headers: HeaderMap,
) -> Response {
    let saved = match catalog.toggle_save(&session.account, job_id) {
        Ok(saved) => saved,
        Err(err) => return err.into_response(),
    };

    // Back to where the user came from
    let location = safe_next(param.next.as_deref())
        .or_else(|| same_site_referer(&headers))
        .unwrap_or_else(|| JOB_LIST_PATH.to_string());
    if saved {
        Redirect::success(location, "Job saved to your list.").into_response()
    } else {
        Redirect::info(location, "Job removed from your saved list.").into_response()
    }
}

async fn saved_jobs(State(catalog): State<GuardedJobCatalog>, session: Session) -> Response {
    match catalog.saved_jobs(&session.account) {
        Ok(saved) => Json(saved).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn companies(State(user_manager): State<GuardedUserManager>) -> Response {
    match user_manager.companies() {
        Ok(companies) => Json(companies).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn company_detail(
    State(user_manager): State<GuardedUserManager>,
    State(catalog): State<GuardedJobCatalog>,
    Path(employer_id): Path<usize>,
) -> Response {
    let company = match user_manager.company(employer_id) {
        Ok(company) => company,
        Err(err) => return err.into_response(),
    };
    match catalog.company_jobs(employer_id) {
        Ok(jobs) => Json(CompanyPage { company, jobs }).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn make_job_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/jobs/", get(search_jobs))
        .route("/jobs/{id}/", get(get_job))
        .route("/jobs/dashboard/", get(seeker_dashboard))
        .route("/jobs/employer/dashboard/", get(employer_dashboard))
        .route("/jobs/create/", post(create_job))
        .route("/jobs/{id}/edit/", get(get_job_for_edit).post(edit_job))
        .route("/jobs/{id}/delete/", post(delete_job))
        .route("/jobs/{id}/save/", post(toggle_save))
        .route("/jobs/saved/", get(saved_jobs))
        .route("/jobs/companies/", get(companies))
        .route("/jobs/companies/{id}/", get(company_detail))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::same_site_referer;
    use axum::http::{header, HeaderMap};

    fn headers(referer: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "jobs.example.com:8000".parse().unwrap());
        headers.insert(header::REFERER, referer.parse().unwrap());
        headers
    }

    #[test]
    fn referer_is_kept_only_for_this_host() {
        assert_eq!(
            same_site_referer(&headers("http://jobs.example.com:8000/jobs/?q=rust&page=2")),
            Some("/jobs/?q=rust&page=2".to_string())
        );
        assert_eq!(
            same_site_referer(&headers("/jobs/saved/")),
            Some("/jobs/saved/".to_string())
        );
        assert_eq!(
            same_site_referer(&headers("https://evil.example.com/phish")),
            None
        );
        assert_eq!(
            same_site_referer(&headers("http://jobs.example.com:9000/jobs/")),
            None
        );
        assert_eq!(same_site_referer(&headers("//evil.example.com/")), None);
        assert_eq!(same_site_referer(&HeaderMap::new()), None);
    }
}
