//! Journ server library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod background_jobs;
pub mod clock;
pub mod config;
pub mod journal;
pub mod notifications;
pub mod server;
pub mod sqlite_persistence;
pub mod user;
pub mod verification;

// Re-export commonly used types for convenience
pub use server::{run_server, RequestsLoggingLevel};
pub use user::{SqliteUserStore, UserStore};
