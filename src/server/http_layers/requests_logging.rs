//! Request logging middleware
//!
//! Session tokens and passwords never reach the log: credential headers are
//! masked and JSON bodies have their password fields replaced. Multipart
//! bodies carry resumes and logos, only their size is logged.

use super::super::state::ServerState;
use crate::server::metrics::{categorize_endpoint, record_http_request};
use axum::extract::State;
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, Request, Response, StatusCode},
    middleware::Next,
};
use std::time::Instant;
use tracing::{error, info};

#[derive(PartialEq, PartialOrd, Clone, Debug, Default, clap::ValueEnum)]
pub enum RequestsLoggingLevel {
    None,
    #[default]
    Path,
    Headers,
    Body,
}

impl std::fmt::Display for RequestsLoggingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

const MAX_LOGGABLE_BODY_LENGTH: usize = 1024;

const MASKED: &str = "<masked>";

const SECRET_FIELDS: [&str; 3] = ["password", "password_confirmation", "token"];

fn content_length(headers: &HeaderMap) -> Result<usize, &'static str> {
    headers
        .get(header::CONTENT_LENGTH)
        .ok_or("Content-length not set.")?
        .to_str()
        .map_err(|_| "Could not get Content-length string value.")?
        .parse::<usize>()
        .map_err(|_| "Could not parse Content-length numeric value.")
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/"))
}

fn is_secret_header(name: &HeaderName) -> bool {
    *name == header::COOKIE || *name == header::SET_COOKIE || *name == header::AUTHORIZATION
}

fn log_headers(label: &str, headers: &HeaderMap) {
    info!("  {} Headers:", label);
    for (name, value) in headers.iter() {
        if is_secret_header(name) {
            info!("    {:?}: {}", name, MASKED);
        } else {
            info!("    {:?}: {:?}", name, value);
        }
    }
}

/// The body as it can be logged, with secret JSON fields masked.
fn loggable_body(bytes: &[u8]) -> String {
    let Ok(mut json) = serde_json::from_slice::<serde_json::Value>(bytes) else {
        return String::from_utf8_lossy(bytes).into_owned();
    };
    if let Some(object) = json.as_object_mut() {
        for field in SECRET_FIELDS {
            if let Some(value) = object.get_mut(field) {
                *value = serde_json::Value::String(MASKED.to_string());
            }
        }
    }
    json.to_string()
}

/// Logs a body that is small enough, and returns it to be put back in place.
/// Bodies that are not logged are returned untouched.
async fn log_body(label: &str, headers: &HeaderMap, body: Body) -> Result<Body, axum::Error> {
    let size = match content_length(headers) {
        Ok(size) => size,
        Err(reason) => {
            info!("  {} Body: {}", label, reason);
            return Ok(body);
        }
    };
    if is_multipart(headers) {
        info!(
            "  {} Body: multipart upload ({:#})",
            label,
            byte_unit::Byte::from(size)
        );
        return Ok(body);
    }
    if size >= MAX_LOGGABLE_BODY_LENGTH {
        info!(
            "  {} Body: Too big to log ({:#})",
            label,
            byte_unit::Byte::from(size)
        );
        return Ok(body);
    }

    let bytes: Bytes = axum::body::to_bytes(body, size).await?;
    info!("  {} Body:\n{}", label, loggable_body(&bytes));
    Ok(Body::from(bytes))
}

fn internal_error_response() -> Response<Body> {
    let mut response = Response::new(Body::from("Internal Server Error"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

pub async fn log_requests(
    State(state): State<ServerState>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let level = state.config.requests_logging_level.clone();
    let start = Instant::now();

    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    if level > RequestsLoggingLevel::None {
        info!(">>> {} {}", method, request.uri());
    }
    if level >= RequestsLoggingLevel::Headers {
        log_headers("Req", request.headers());
    }

    let request = if level >= RequestsLoggingLevel::Body {
        let (parts, body) = request.into_parts();
        match log_body("Req", &parts.headers, body).await {
            Ok(body) => Request::from_parts(parts, body),
            Err(err) => {
                error!("Failed to read request body: {:?}", err);
                return internal_error_response();
            }
        }
    } else {
        request
    };

    let response = next.run(request).await;

    if level >= RequestsLoggingLevel::Headers {
        log_headers("Resp", response.headers());
    }

    let response = if level >= RequestsLoggingLevel::Body {
        let (parts, body) = response.into_parts();
        match log_body("Resp", &parts.headers, body).await {
            Ok(body) => Response::from_parts(parts, body),
            Err(err) => {
                error!("Failed to read response body: {:?}", err);
                return internal_error_response();
            }
        }
    } else {
        response
    };

    let status = response.status();
    let duration = start.elapsed();

    if level > RequestsLoggingLevel::None {
        match response.headers().get(header::LOCATION) {
            Some(location) if status.is_redirection() => info!(
                "<<< {} -> {:?} ({}ms)",
                status.as_u16(),
                location,
                duration.as_millis()
            ),
            _ => info!("<<< {} ({}ms)", status.as_u16(), duration.as_millis()),
        }
    }

    record_http_request(&method, &categorize_endpoint(&path), status.as_u16(), duration);

    response
}
