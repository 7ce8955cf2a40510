//! /accounts: registration, login, activation, profile and notifications.

use super::multipart::{MultipartForm, MAX_UPLOAD_REQUEST_BYTES};
use super::responses::{Flash, FlashLevel, Redirect, LOGIN_PATH, PROFILE_PATH};
use super::session::{Session, COOKIE_SESSION_TOKEN_KEY};
use super::state::{GuardedUserManager, ServerState};
use crate::server::metrics;
use crate::user::{Account, AccountError, ActivationOutcome, AuthToken, RegistrationForm};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Deserialize, Debug)]
struct LoginBody {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Serialize)]
struct LoginSuccessResponse<'a> {
    token: &'a str,
    redirect: String,
    account: &'a Account,
}

#[derive(Serialize)]
struct RegistrationResponse<'a> {
    token: &'a str,
    account: &'a Account,
    message: Flash,
    redirect: &'static str,
}

#[derive(Serialize)]
struct ProfilePage {
    #[serde(flatten)]
    account: Account,
    unread_count: usize,
}

/// A local path to continue to, never another host.
pub(super) fn safe_next(next: Option<&str>) -> Option<String> {
    next.map(str::trim)
        .filter(|next| next.starts_with('/') && !next.starts_with("//"))
        .map(str::to_string)
}

fn session_cookie(token: &AuthToken) -> String {
    Cookie::build((COOKIE_SESSION_TOKEN_KEY, token.value.0.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
        .to_string()
}

async fn register(
    State(user_manager): State<GuardedUserManager>,
    Json(form): Json<RegistrationForm>,
) -> Response {
    let session = match user_manager.register(&form) {
        Ok(session) => session,
        Err(err) => return err.into_response(),
    };
    metrics::record_registration();

    let body = RegistrationResponse {
        token: &session.token.value.0,
        account: &session.account,
        message: Flash {
            level: FlashLevel::Info,
            text: "Registration successful. We have sent a verification email to your address."
                .to_string(),
        },
        redirect: "/",
    };
    (
        StatusCode::CREATED,
        [(header::SET_COOKIE, session_cookie(&session.token))],
        Json(body),
    )
        .into_response()
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<LoginBody>,
) -> Response {
    debug!("Login attempt for {}", body.username);
    let start = Instant::now();
    let session = match user_manager.login(&body.username, &body.password) {
        Ok(session) => session,
        Err(err) => {
            let status = if matches!(err, AccountError::InvalidCredentials) {
                "failure"
            } else {
                "error"
            };
            metrics::record_login_attempt(status, start.elapsed());
            return err.into_response();
        }
    };
    metrics::record_login_attempt("success", start.elapsed());

    let redirect = safe_next(body.next.as_deref())
        .unwrap_or_else(|| session.account.landing_page().to_string());
    let response_body = LoginSuccessResponse {
        token: &session.token.value.0,
        redirect,
        account: &session.account,
    };
    (
        StatusCode::CREATED,
        [(header::SET_COOKIE, session_cookie(&session.token))],
        Json(response_body),
    )
        .into_response()
}

async fn logout(State(user_manager): State<GuardedUserManager>, session: Option<Session>) -> Response {
    if let Some(session) = session {
        if let Err(err) = user_manager.logout(&session.token) {
            return err.into_response();
        }
        info!("User {} logged out", session.account.id());
    }

    let cookie_value = Cookie::build((COOKIE_SESSION_TOKEN_KEY, ""))
        .path("/")
        .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1)) // Expire it in the past
        .same_site(SameSite::Lax)
        .build();
    (
        [(header::SET_COOKIE, cookie_value.to_string())],
        Redirect::to("/"),
    )
        .into_response()
}

async fn activate(
    State(user_manager): State<GuardedUserManager>,
    Path((uid, token)): Path<(String, String)>,
) -> Response {
    match user_manager.activate(&uid, &token) {
        Ok(ActivationOutcome::Verified) | Ok(ActivationOutcome::AlreadyVerified) => {
            Redirect::success(LOGIN_PATH, "Your email has been verified.").into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn get_profile(State(user_manager): State<GuardedUserManager>, session: Session) -> Response {
    match user_manager.unread_count(session.account.id()) {
        Ok(unread_count) => Json(ProfilePage {
            account: session.account,
            unread_count,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn edit_profile(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
    multipart: Multipart,
) -> Response {
    let form = match MultipartForm::read(multipart).await {
        Ok(form) => form.into_profile_form(),
        Err(rejection) => return rejection.into_response(),
    };
    match user_manager.edit_profile(session.account.id(), &form) {
        Ok(_) => Redirect::success(PROFILE_PATH, "Profile updated.").into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_notifications(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
) -> Response {
    match user_manager.inbox(session.account.id()) {
        Ok(notifications) => Json(notifications).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_unread_count(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
) -> Response {
    match user_manager.unread_count(session.account.id()) {
        Ok(unread_count) => Json(serde_json::json!({ "unread_count": unread_count })).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn make_account_routes(state: ServerState) -> Router {
    Router::new()
        .route("/register/", post(register))
        .route("/login/", post(login))
        .route("/logout/", post(logout))
        .route("/activate/{uid}/{token}/", get(activate))
        .route("/profile/", get(get_profile))
        .route(
            "/profile/edit/",
            post(edit_profile).layer(DefaultBodyLimit::max(MAX_UPLOAD_REQUEST_BYTES)),
        )
        .route("/notifications/", get(get_notifications))
        .route("/notifications/unread/", get(get_unread_count))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::safe_next;

    #[test]
    fn only_local_paths_are_followed() {
        assert_eq!(safe_next(Some("/jobs/3/")), Some("/jobs/3/".to_string()));
        assert_eq!(safe_next(Some("https://evil.example.com/")), None);
        assert_eq!(safe_next(Some("//evil.example.com/")), None);
        assert_eq!(safe_next(None), None);
    }
}
