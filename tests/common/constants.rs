//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When test data changes (user credentials, start time, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Password shared by every seeded user
pub const TEST_PASS: &str = "Correct-Horse-42";

/// Verified employer posting most of the test jobs
pub const EMPLOYER_USER: &str = "acme_hr";
pub const EMPLOYER_EMAIL: &str = "hr@acme.example.com";
pub const EMPLOYER_COMPANY: &str = "Acme Corp";

/// A second verified employer, used for ownership checks
pub const OTHER_EMPLOYER_USER: &str = "globex_hr";
pub const OTHER_EMPLOYER_EMAIL: &str = "hr@globex.example.com";

/// Verified job seeker
pub const SEEKER_USER: &str = "alice";
pub const SEEKER_EMAIL: &str = "alice@example.com";

/// Job seeker that never clicked the activation link
pub const UNVERIFIED_SEEKER_USER: &str = "bob";
pub const UNVERIFIED_SEEKER_EMAIL: &str = "bob@example.com";

// ============================================================================
// Time
// ============================================================================

/// Unix time the test clock starts at
pub const START_TIME: i64 = 1_700_000_000;

pub const ONE_HOUR_SECS: u64 = 60 * 60;

// ============================================================================
// Test Timeouts
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between server readiness checks (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Default HTTP request timeout (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
