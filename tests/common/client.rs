//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all job board endpoints.
//!
//! Redirects are never followed, so tests can look at the `Location` header
//! and the flash message of every 303.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Response};
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

/// Target of a 303 response.
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("Response has no Location header")
        .to_str()
        .expect("Location header is not valid UTF-8")
        .to_string()
}

/// Level and text of the flash message carried by a redirect.
pub async fn flash(response: Response) -> (String, String) {
    let body: Value = response.json().await.expect("Redirect body is not JSON");
    let message = &body["message"];
    (
        message["level"].as_str().unwrap_or_default().to_string(),
        message["text"].as_str().unwrap_or_default().to_string(),
    )
}

/// A complete job form, the caller overrides what it cares about.
pub fn job_form(title: &str) -> Value {
    json!({
        "title": title,
        "company": EMPLOYER_COMPANY,
        "location": "Berlin",
        "salary": "50000",
        "category": "Engineering",
        "job_type": "Full-Time",
        "description": format!("We are hiring a {}.", title),
        "status": "Open",
    })
}

/// A valid application, with a resume when `resume_name` is given.
pub fn application_form(qualification: &str, resume_name: Option<&str>) -> Form {
    let form = Form::new()
        .text("qualification", qualification.to_string())
        .text("phone", "+49 30 1234567")
        .text("experience", "3 years")
        .text("cover_letter", "I would love to work with you.");
    match resume_name {
        Some(name) => form.part(
            "resume",
            Part::bytes(b"%PDF-1.4 resume".to_vec()).file_name(name.to_string()),
        ),
        None => form,
    }
}

impl TestClient {
    /// Creates a new unauthenticated client
    ///
    /// Use this for testing authentication flows.
    /// For most tests, use `authenticated()` instead.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle session cookies
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client logged in as one of the seeded users
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String, username: &str) -> Self {
        let client = Self::new(base_url);

        let response = client.login(username, TEST_PASS).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Authentication of {} failed: {:?}",
            username,
            response.text().await
        );

        client
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .unwrap_or_else(|e| panic!("GET {} failed: {}", path, e))
    }

    async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .unwrap_or_else(|e| panic!("POST {} failed: {}", path, e))
    }

    async fn post_empty(&self, path: &str) -> Response {
        self.client
            .post(self.url(path))
            .send()
            .await
            .unwrap_or_else(|e| panic!("POST {} failed: {}", path, e))
    }

    async fn post_multipart(&self, path: &str, form: Form) -> Response {
        self.client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .unwrap_or_else(|e| panic!("POST {} failed: {}", path, e))
    }

    // ========================================================================
    // Account Endpoints
    // ========================================================================

    /// POST /accounts/register/
    pub async fn register(&self, username: &str, email: &str, role: &str) -> Response {
        self.post_json(
            "/accounts/register/",
            &json!({
                "username": username,
                "email": email,
                "password": TEST_PASS,
                "password_confirmation": TEST_PASS,
                "role": role,
            }),
        )
        .await
    }

    /// POST /accounts/login/
    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.post_json(
            "/accounts/login/",
            &json!({ "username": username, "password": password }),
        )
        .await
    }

    /// POST /accounts/login/ with a page to continue to
    pub async fn login_with_next(&self, username: &str, password: &str, next: &str) -> Response {
        self.post_json(
            "/accounts/login/",
            &json!({ "username": username, "password": password, "next": next }),
        )
        .await
    }

    /// POST /accounts/logout/
    pub async fn logout(&self) -> Response {
        self.post_empty("/accounts/logout/").await
    }

    /// GET an activation link, absolute or relative to the server
    pub async fn follow_link(&self, link: &str) -> Response {
        let url = if link.starts_with("http") {
            link.to_string()
        } else {
            self.url(link)
        };
        self.client
            .get(url)
            .send()
            .await
            .expect("Link request failed")
    }

    /// GET /accounts/profile/
    pub async fn get_profile(&self) -> Response {
        self.get("/accounts/profile/").await
    }

    /// POST /accounts/profile/edit/
    pub async fn edit_profile(&self, form: Form) -> Response {
        self.post_multipart("/accounts/profile/edit/", form).await
    }

    /// GET /accounts/notifications/
    pub async fn get_notifications(&self) -> Response {
        self.get("/accounts/notifications/").await
    }

    /// GET /accounts/notifications/unread/
    pub async fn get_unread_count(&self) -> Response {
        self.get("/accounts/notifications/unread/").await
    }

    // ========================================================================
    // Job Endpoints
    // ========================================================================

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.get("/").await
    }

    /// GET /jobs/?{query}
    pub async fn search_jobs(&self, query: &[(&str, &str)]) -> Response {
        self.client
            .get(self.url("/jobs/"))
            .query(query)
            .send()
            .await
            .expect("Search request failed")
    }

    /// GET /jobs/{id}/
    pub async fn get_job(&self, job_id: usize) -> Response {
        self.get(&format!("/jobs/{}/", job_id)).await
    }

    /// POST /jobs/create/
    pub async fn create_job(&self, form: &Value) -> Response {
        self.post_json("/jobs/create/", form).await
    }

    /// Creates a job and returns its id, taken from the redirect
    pub async fn create_job_id(&self, form: &Value) -> usize {
        let response = self.create_job(form).await;
        assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
        let target = location(&response);
        target
            .trim_start_matches("/jobs/")
            .trim_end_matches('/')
            .parse()
            .unwrap_or_else(|_| panic!("Unexpected job location {}", target))
    }

    /// GET /jobs/{id}/edit/
    pub async fn get_job_for_edit(&self, job_id: usize) -> Response {
        self.get(&format!("/jobs/{}/edit/", job_id)).await
    }

    /// POST /jobs/{id}/edit/
    pub async fn edit_job(&self, job_id: usize, form: &Value) -> Response {
        self.post_json(&format!("/jobs/{}/edit/", job_id), form).await
    }

    /// POST /jobs/{id}/delete/
    pub async fn delete_job(&self, job_id: usize) -> Response {
        self.post_empty(&format!("/jobs/{}/delete/", job_id)).await
    }

    /// POST /jobs/{id}/save/
    pub async fn toggle_save(&self, job_id: usize) -> Response {
        self.post_empty(&format!("/jobs/{}/save/", job_id)).await
    }

    /// POST /jobs/{id}/save/?next={next}
    pub async fn toggle_save_with_next(&self, job_id: usize, next: &str) -> Response {
        self.client
            .post(self.url(&format!("/jobs/{}/save/", job_id)))
            .query(&[("next", next)])
            .send()
            .await
            .expect("Save request failed")
    }

    /// GET /jobs/saved/
    pub async fn get_saved_jobs(&self) -> Response {
        self.get("/jobs/saved/").await
    }

    /// GET /jobs/dashboard/
    pub async fn get_seeker_dashboard(&self) -> Response {
        self.get("/jobs/dashboard/").await
    }

    /// GET /jobs/employer/dashboard/
    pub async fn get_employer_dashboard(&self) -> Response {
        self.get("/jobs/employer/dashboard/").await
    }

    /// GET /jobs/companies/
    pub async fn get_companies(&self) -> Response {
        self.get("/jobs/companies/").await
    }

    /// GET /jobs/companies/{id}/
    pub async fn get_company(&self, employer_id: usize) -> Response {
        self.get(&format!("/jobs/companies/{}/", employer_id)).await
    }

    // ========================================================================
    // Application Endpoints
    // ========================================================================

    /// POST /jobs/{id}/apply/
    pub async fn apply(&self, job_id: usize, form: Form) -> Response {
        self.post_multipart(&format!("/jobs/{}/apply/", job_id), form)
            .await
    }

    /// GET /jobs/{id}/applications/
    pub async fn get_job_applications(&self, job_id: usize) -> Response {
        self.get(&format!("/jobs/{}/applications/", job_id)).await
    }

    /// POST /jobs/{id}/applications/
    pub async fn set_application_status(
        &self,
        job_id: usize,
        application_id: usize,
        status: &str,
    ) -> Response {
        self.post_json(
            &format!("/jobs/{}/applications/", job_id),
            &json!({ "application_id": application_id, "status": status }),
        )
        .await
    }

    /// GET /jobs/applications/?sort={sort}
    pub async fn get_my_applications(&self, sort: &str) -> Response {
        self.client
            .get(self.url("/jobs/applications/"))
            .query(&[("sort", sort)])
            .send()
            .await
            .expect("My applications request failed")
    }

    /// GET /jobs/applications/{id}/edit/
    pub async fn get_application_for_edit(&self, application_id: usize) -> Response {
        self.get(&format!("/jobs/applications/{}/edit/", application_id))
            .await
    }

    /// POST /jobs/applications/{id}/edit/
    pub async fn edit_application(&self, application_id: usize, form: Form) -> Response {
        self.post_multipart(&format!("/jobs/applications/{}/edit/", application_id), form)
            .await
    }

    /// POST /jobs/applications/{id}/withdraw/
    pub async fn withdraw_application(&self, application_id: usize) -> Response {
        self.post_empty(&format!("/jobs/applications/{}/withdraw/", application_id))
            .await
    }
}
