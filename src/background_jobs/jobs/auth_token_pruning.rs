//! Deletes refresh tokens that are past their lifetime.

use crate::background_jobs::{TaskContext, TaskError, Worker};
use crate::clock::Clock;
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct AuthTokenPruningJob {
    token_ttl: ChronoDuration,
    clock: Arc<dyn Clock>,
}

impl AuthTokenPruningJob {
    pub const NAME: &'static str = "auth_token_pruning";

    pub fn new(token_ttl: ChronoDuration, clock: Arc<dyn Clock>) -> Self {
        Self { token_ttl, clock }
    }

    pub fn execute(&self, ctx: &TaskContext) -> Result<(), TaskError> {
        if ctx.is_cancelled() {
            return Err(TaskError::Cancelled);
        }

        let cutoff = self.clock.now() - self.token_ttl;
        let deleted = ctx.user_store.prune_auth_tokens_created_before(cutoff)?;

        if deleted > 0 {
            info!("Pruned {} expired refresh tokens", deleted);
        } else {
            info!("No expired refresh tokens to prune");
        }
        Ok(())
    }

    /// A periodic worker running this job every `interval`.
    pub fn into_worker(self, interval: Duration) -> Worker {
        Worker::new(Self::NAME)
            .with_action(move |ctx| self.execute(ctx))
            .every(interval)
    }
}
