//! End-to-end tests for bookmarking jobs

mod common;

use common::*;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_toggle_save_twice_restores_state() {
    let server = TestServer::spawn().await;
    let employer = TestClient::authenticated(server.base_url.clone(), EMPLOYER_USER).await;
    let seeker = TestClient::authenticated(server.base_url.clone(), SEEKER_USER).await;
    let job_id = employer.create_job_id(&job_form("Data Scientist")).await;

    let response = seeker.toggle_save(job_id).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/jobs/");
    assert_eq!(
        flash(response).await,
        ("success".to_string(), "Job saved to your list.".to_string())
    );

    let saved: Value = seeker.get_saved_jobs().await.json().await.unwrap();
    assert_eq!(saved[0]["job"]["id"], job_id);
    assert_eq!(saved[0]["saved_at"], START_TIME);
    let job: Value = seeker.get_job(job_id).await.json().await.unwrap();
    assert_eq!(job["is_saved"], true);

    let response = seeker.toggle_save(job_id).await;
    assert_eq!(
        flash(response).await,
        (
            "info".to_string(),
            "Job removed from your saved list.".to_string()
        )
    );

    let saved: Value = seeker.get_saved_jobs().await.json().await.unwrap();
    assert_eq!(saved, json!([]));
    let job: Value = seeker.get_job(job_id).await.json().await.unwrap();
    assert_eq!(job["is_saved"], false);
}

#[tokio::test]
async fn test_toggle_save_goes_back() {
    let server = TestServer::spawn().await;
    let employer = TestClient::authenticated(server.base_url.clone(), EMPLOYER_USER).await;
    let seeker = TestClient::authenticated(server.base_url.clone(), SEEKER_USER).await;
    let job_id = employer.create_job_id(&job_form("Copywriter")).await;

    let response = seeker.toggle_save_with_next(job_id, "/jobs/saved/").await;
    assert_eq!(location(&response), "/jobs/saved/");

    // Off-site targets are ignored
    let response = seeker
        .toggle_save_with_next(job_id, "//evil.example.com/")
        .await;
    assert_eq!(location(&response), "/jobs/");

    let post_with_referer = |referer: String| {
        seeker
            .client
            .post(format!("{}/jobs/{}/save/", server.base_url, job_id))
            .header(reqwest::header::REFERER, referer)
            .send()
    };
    let response = post_with_referer(format!("{}/jobs/{}/?tab=details", server.base_url, job_id))
        .await
        .unwrap();
    assert_eq!(location(&response), format!("/jobs/{}/?tab=details", job_id));

    // A referer from another site is not followed
    let response = post_with_referer("https://evil.example.com/phish".to_string())
        .await
        .unwrap();
    assert_eq!(location(&response), "/jobs/");
}

#[tokio::test]
async fn test_only_open_jobs_can_be_saved() {
    let server = TestServer::spawn().await;
    let employer = TestClient::authenticated(server.base_url.clone(), EMPLOYER_USER).await;
    let seeker = TestClient::authenticated(server.base_url.clone(), SEEKER_USER).await;

    let mut draft = job_form("Unannounced");
    draft["status"] = json!("Draft");
    let draft_id = employer.create_job_id(&draft).await;

    assert_eq!(
        seeker.toggle_save(draft_id).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        seeker.toggle_save(9999).await.status(),
        StatusCode::NOT_FOUND
    );
    let saved: Value = seeker.get_saved_jobs().await.json().await.unwrap();
    assert_eq!(saved, json!([]));
}

#[tokio::test]
async fn test_seeker_dashboard_counts_saved_jobs() {
    let server = TestServer::spawn().await;
    let employer = TestClient::authenticated(server.base_url.clone(), EMPLOYER_USER).await;
    let seeker = TestClient::authenticated(server.base_url.clone(), SEEKER_USER).await;

    let first = employer.create_job_id(&job_form("Analyst")).await;
    let second = employer.create_job_id(&job_form("Engineer")).await;
    seeker.toggle_save(first).await;
    server.advance_hours(1);
    seeker.toggle_save(second).await;

    let dashboard: Value = seeker.get_seeker_dashboard().await.json().await.unwrap();
    assert_eq!(dashboard["total_saved"], 2);
    assert_eq!(dashboard["saved_jobs"][0]["job"]["id"], second);
    assert_eq!(dashboard["total_applications"], 0);
}
