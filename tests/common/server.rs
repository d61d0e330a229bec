//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own database, an in-memory
//! mailer and a clock that only moves when the test says so.

use super::constants::*;
use super::fixtures::{create_test_users, extract_code};
use journ_server::background_jobs::{create_task_runner, TaskContext};
use journ_server::clock::{Clock, ManualClock};
use journ_server::journal::JournalManager;
use journ_server::notifications::{MemoryMailer, OutgoingEmail, VerificationEmailTemplate};
use journ_server::server::{make_app, RequestsLoggingLevel, ServerConfig, ServerState};
use journ_server::user::{AccessTokenSigner, FullUserStore, SqliteUserStore, UserManager};
use journ_server::verification::{VerificationLinks, VerificationManager};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Test server instance with an isolated database
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// User store for direct database access in tests
    pub user_store: Arc<dyn FullUserStore>,

    /// Every email the server sent
    pub mailer: Arc<MemoryMailer>,

    /// The clock behind token and verification expiry
    pub clock: Arc<ManualClock>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    shutdown: CancellationToken,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the database cannot be created, the port cannot be bound
    /// or the server does not become ready within the timeout.
    pub async fn spawn() -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let user_store: Arc<dyn FullUserStore> = Arc::new(
            SqliteUserStore::new(temp_db_dir.path().join("user.db"))
                .expect("Failed to open user store"),
        );
        let mailer = Arc::new(MemoryMailer::default());
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let shutdown = CancellationToken::new();
        let (runner, supervisor) = create_task_runner(TaskContext::new(
            shutdown.clone(),
            user_store.clone(),
            mailer.clone(),
        ));
        tokio::spawn(supervisor.run());

        let user_manager = UserManager::new(
            user_store.clone(),
            AccessTokenSigner::new(TEST_JWT_SECRET.as_bytes(), chrono::Duration::hours(2)),
            chrono::Duration::days(7),
            clock.clone(),
        );
        create_test_users(&user_manager, &user_store).expect("Failed to create test users");

        let verification_manager = VerificationManager::new(
            user_store.clone(),
            runner,
            clock.clone(),
            VerificationLinks {
                verification_url: format!("{}/v1/auth/account/activation", base_url),
                verified_redirect_url: VERIFIED_REDIRECT_URL.to_string(),
                request_activation_redirect_url: REQUEST_ACTIVATION_REDIRECT_URL.to_string(),
            },
            VerificationEmailTemplate::default(),
        );

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            metrics_port: None,
        };
        let state = ServerState::new(
            config,
            user_manager,
            verification_manager,
            JournalManager::new(user_store.clone()),
        );
        let app = make_app(state);

        // Spawn server in background task with graceful shutdown
        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            user_store,
            mailer,
            clock,
            _temp_db_dir: temp_db_dir,
            shutdown,
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }

    /// Waits until `count` emails have been sent to `email` and returns the last one.
    ///
    /// Emails go out from a background task, so they can land after the
    /// response that triggered them.
    pub async fn wait_for_email(&self, email: &str, count: usize) -> OutgoingEmail {
        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(EMAIL_DELIVERY_TIMEOUT_MS);

        loop {
            let sent: Vec<OutgoingEmail> = self
                .mailer
                .sent()
                .into_iter()
                .filter(|m| m.to.email == email)
                .collect();
            if sent.len() >= count {
                return sent[count - 1].clone();
            }
            if start.elapsed() > timeout {
                panic!("No email number {} for {} within {:?}", count, email, timeout);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// The encoded code from the `count`-th verification email sent to `email`.
    pub async fn verification_code_for(&self, email: &str, count: usize) -> String {
        let message = self.wait_for_email(email, count).await;
        extract_code(&message.html).expect("Verification email without a code")
    }

    pub fn advance_clock(&self, by: chrono::Duration) {
        self.clock.advance(by);
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        // TempDir will be cleaned up automatically
    }
}
