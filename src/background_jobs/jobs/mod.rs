//! Periodic maintenance jobs.

pub mod auth_token_pruning;

pub use auth_token_pruning::AuthTokenPruningJob;
