use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all job board metrics
const PREFIX: &str = "jobboard";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Authentication Metrics
    pub static ref AUTH_LOGIN_ATTEMPTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_auth_login_attempts_total"), "Total login attempts"),
        &["status"]
    ).expect("Failed to create auth_login_attempts_total metric");

    pub static ref AUTH_LOGIN_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_auth_login_duration_seconds"),
            "Login request duration in seconds"
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0])
    ).expect("Failed to create auth_login_duration_seconds metric");

    pub static ref REGISTRATIONS_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_registrations_total"),
        "Total accounts registered"
    ).expect("Failed to create registrations_total metric");

    // Workflow Metrics
    pub static ref APPLICATIONS_SUBMITTED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_applications_submitted_total"),
        "Total job applications submitted"
    ).expect("Failed to create applications_submitted_total metric");

    pub static ref APPLICATION_STATUS_CHANGES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_application_status_changes_total"),
            "Application status changes by new status"
        ),
        &["status"]
    ).expect("Failed to create application_status_changes_total metric");

    pub static ref NOTIFICATIONS_CREATED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_notifications_created_total"),
        "Total in-app notifications created"
    ).expect("Failed to create notifications_created_total metric");

    pub static ref EMAILS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_emails_total"), "Outbound emails by delivery outcome"),
        &["outcome"]
    ).expect("Failed to create emails_total metric");

    // Error Metrics
    pub static ref ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_errors_total"), "Total errors by type and endpoint"),
        &["error_type", "endpoint"]
    ).expect("Failed to create errors_total metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Registering twice fails, which happens in tests
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(AUTH_LOGIN_ATTEMPTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(AUTH_LOGIN_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(REGISTRATIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(APPLICATIONS_SUBMITTED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(APPLICATION_STATUS_CHANGES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(NOTIFICATIONS_CREATED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(EMAILS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Collapses numeric path segments so that every job or application id does
/// not get its own label value.
pub fn categorize_endpoint(path: &str) -> String {
    if path.starts_with("/accounts/activate/") {
        return "/accounts/activate/{uid}/{token}/".to_string();
    }
    if path.starts_with("/media/") {
        return "/media/{file}".to_string();
    }
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a login attempt
pub fn record_login_attempt(status: &str, duration: Duration) {
    AUTH_LOGIN_ATTEMPTS_TOTAL
        .with_label_values(&[status])
        .inc();

    AUTH_LOGIN_DURATION_SECONDS.observe(duration.as_secs_f64());
}

pub fn record_registration() {
    REGISTRATIONS_TOTAL.inc();
}

pub fn record_application_submitted() {
    APPLICATIONS_SUBMITTED_TOTAL.inc();
}

pub fn record_status_change(new_status: &str) {
    APPLICATION_STATUS_CHANGES_TOTAL
        .with_label_values(&[new_status])
        .inc();
}

pub fn record_notification_created() {
    NOTIFICATIONS_CREATED_TOTAL.inc();
}

/// Record the outcome of an outbound email: "sent", "failed" or "logged"
pub fn record_email(outcome: &str) {
    EMAILS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record an error
pub fn record_error(error_type: &str, endpoint: &str) {
    ERRORS_TOTAL
        .with_label_values(&[error_type, endpoint])
        .inc();
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        if let Ok(kb) = kb_str.parse::<f64>() {
                            PROCESS_MEMORY_BYTES.set(kb * 1024.0);
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_metric(name: &str) -> bool {
        REGISTRY.gather().iter().any(|m| m.get_name() == name)
    }

    #[test]
    fn test_metrics_initialization() {
        init_metrics();
        assert!(!REGISTRY.gather().is_empty(), "Metrics should be registered");
    }

    #[test]
    fn test_record_http_request() {
        init_metrics();
        record_http_request("GET", "/jobs/{id}/", 200, Duration::from_millis(50));
        assert!(has_metric("jobboard_http_requests_total"));
    }

    #[test]
    fn test_record_login_attempt() {
        init_metrics();
        record_login_attempt("success", Duration::from_secs(1));
        record_login_attempt("failure", Duration::from_millis(500));
        assert!(has_metric("jobboard_auth_login_attempts_total"));
    }

    #[test]
    fn test_workflow_metrics() {
        init_metrics();
        record_application_submitted();
        record_status_change("Interview");
        record_notification_created();
        record_email("sent");
        assert!(has_metric("jobboard_applications_submitted_total"));
        assert!(has_metric("jobboard_application_status_changes_total"));
        assert!(has_metric("jobboard_emails_total"));
    }

    #[test]
    fn test_categorize_endpoint() {
        assert_eq!(categorize_endpoint("/jobs/12/apply/"), "/jobs/{id}/apply/");
        assert_eq!(
            categorize_endpoint("/jobs/applications/7/edit/"),
            "/jobs/applications/{id}/edit/"
        );
        assert_eq!(
            categorize_endpoint("/accounts/activate/MQ/abc-def/"),
            "/accounts/activate/{uid}/{token}/"
        );
        assert_eq!(categorize_endpoint("/media/resumes/x.pdf"), "/media/{file}");
        assert_eq!(categorize_endpoint("/"), "/");
    }
}
