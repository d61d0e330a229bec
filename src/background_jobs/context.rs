use crate::notifications::Mailer;
use crate::user::FullUserStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Context handed to every task invocation.
///
/// The runner keeps one template and forks a fresh copy for each invocation,
/// so an action never sees state left behind by the request that queued it.
#[derive(Clone)]
pub struct TaskContext {
    /// Cancelled when the owning task is cancelled or the runner shuts down.
    pub cancellation_token: CancellationToken,

    /// Access to users, verification codes, refresh tokens and journals.
    pub user_store: Arc<dyn FullUserStore>,

    /// Outgoing email transport.
    pub mailer: Arc<dyn Mailer>,
}

impl TaskContext {
    pub fn new(
        cancellation_token: CancellationToken,
        user_store: Arc<dyn FullUserStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            cancellation_token,
            user_store,
            mailer,
        }
    }

    /// A copy of this context whose token is a child of `parent`.
    pub fn fork(&self, parent: &CancellationToken) -> Self {
        Self {
            cancellation_token: parent.child_token(),
            user_store: Arc::clone(&self.user_store),
            mailer: Arc::clone(&self.mailer),
        }
    }

    /// Long actions should check this and return `TaskError::Cancelled` early.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}
