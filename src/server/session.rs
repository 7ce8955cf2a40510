use super::responses::{internal_error, Redirect, LOGIN_PATH};
use super::state::ServerState;
use crate::user::{Account, AuthTokenValue};

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::debug;

/// The caller's account, resolved from its session token.
#[derive(Debug)]
pub struct Session {
    pub account: Account,
    pub token: AuthTokenValue,
}

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";

pub enum SessionExtractionError {
    /// Not logged in, `next` is where to come back after logging in.
    LoginRequired { next: String },
    InternalError(anyhow::Error),
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> Response {
        match self {
            SessionExtractionError::LoginRequired { next } => Redirect::to(format!(
                "{}?next={}",
                LOGIN_PATH,
                urlencoding::encode(&next)
            ))
            .into_response(),
            SessionExtractionError::InternalError(err) => internal_error(&err),
        }
    }
}

fn extract_session_token_from_cookies(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(COOKIE_SESSION_TOKEN_KEY)
        .map(Cookie::value)
        .filter(|value| !value.is_empty())
        .map(|s| s.to_string())
}

fn extract_session_token_from_headers(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(HEADER_SESSION_TOKEN_KEY)
        .map(|v| v.as_bytes().to_owned())
        .map(|b| String::from_utf8_lossy(&b).into_owned())
}

fn extract_session_from_request_parts(
    parts: &Parts,
    ctx: &ServerState,
) -> Result<Option<Session>, SessionExtractionError> {
    let Some(token) =
        extract_session_token_from_cookies(parts).or_else(|| extract_session_token_from_headers(parts))
    else {
        debug!("No token in cookies nor headers.");
        return Ok(None);
    };

    let token = AuthTokenValue(token);
    match ctx.user_manager.account_for_token(&token) {
        Ok(Some(account)) => {
            debug!("Resolved session of user_id={}", account.id());
            Ok(Some(Session { account, token }))
        }
        Ok(None) => {
            debug!("Auth token not found in database");
            Ok(None)
        }
        Err(err) => Err(SessionExtractionError::InternalError(err.into())),
    }
}

fn requested_path(parts: &Parts) -> String {
    parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string())
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx)?.ok_or_else(|| {
            SessionExtractionError::LoginRequired {
                next: requested_path(parts),
            }
        })
    }
}

impl FromRequestParts<ServerState> for Option<Session> {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx)
    }
}
