mod api_error;
mod auth_routes;
pub mod config;
mod http_layers;
mod journal_routes;
pub mod metrics;
#[allow(clippy::module_inception)]
pub mod server;
mod session;
pub mod state;

pub use api_error::ApiError;
pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
pub use session::{BearerToken, Session};
pub use state::ServerState;
