use axum::extract::FromRef;

use crate::journal::JournalManager;
use crate::user::UserManager;
use crate::verification::VerificationManager;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedUserManager = Arc<UserManager>;
pub type GuardedVerificationManager = Arc<VerificationManager>;
pub type GuardedJournalManager = Arc<JournalManager>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub hash: String,
    pub user_manager: GuardedUserManager,
    pub verification_manager: GuardedVerificationManager,
    pub journal_manager: GuardedJournalManager,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        user_manager: UserManager,
        verification_manager: VerificationManager,
        journal_manager: JournalManager,
    ) -> Self {
        ServerState {
            config,
            start_time: Instant::now(),
            hash: env!("GIT_HASH").to_string(),
            user_manager: Arc::new(user_manager),
            verification_manager: Arc::new(verification_manager),
            journal_manager: Arc::new(journal_manager),
        }
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedVerificationManager {
    fn from_ref(input: &ServerState) -> Self {
        input.verification_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedJournalManager {
    fn from_ref(input: &ServerState) -> Self {
        input.journal_manager.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
