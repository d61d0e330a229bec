//! Shared constants for end-to-end tests
//!
//! When test data changes (user credentials, redirect targets, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Email of the user created (and activated) by every test server
pub const TEST_EMAIL: &str = "alice@example.com";

/// Username of the pre-created test user
pub const TEST_USER: &str = "alice";

/// Password of the pre-created test user
pub const TEST_PASS: &str = "alice-password";

/// A second activated user, for isolation checks
pub const OTHER_EMAIL: &str = "bob@example.com";
pub const OTHER_USER: &str = "bob";
pub const OTHER_PASS: &str = "bob-password";

// ============================================================================
// Redirect Targets
// ============================================================================

pub const VERIFIED_REDIRECT_URL: &str = "http://client.test/account/verified";

pub const REQUEST_ACTIVATION_REDIRECT_URL: &str = "http://client.test/account/request-activation";

/// Secret the test server signs access tokens with
pub const TEST_JWT_SECRET: &str = "journ-test-secret-0123456789";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Maximum time to wait for a verification email to be delivered (milliseconds)
pub const EMAIL_DELIVERY_TIMEOUT_MS: u64 = 5000;
