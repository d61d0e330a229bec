use super::context::TaskContext;
use super::runner::TaskRunner;
use super::task::TaskMode;
use crate::server::metrics;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Completed,
    Failed(String),
    Cancelled,
    Panicked(String),
}

impl TaskStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Completed => "success",
            TaskStatus::Failed(_) => "failed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Panicked(_) => "panic",
        }
    }
}

/// Report of one task invocation, sent to the supervisor once it finishes.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub task: String,
    /// 1-based invocation counter. Immediate tasks always report cycle 1.
    pub cycle: u64,
    pub mode: TaskMode,
    pub status: TaskStatus,
    pub elapsed: Duration,
}

/// Receives every task outcome, logs it and records metrics.
pub struct TaskSupervisor {
    receiver: mpsc::UnboundedReceiver<TaskOutcome>,
    shutdown_token: CancellationToken,
}

impl TaskSupervisor {
    fn new(
        receiver: mpsc::UnboundedReceiver<TaskOutcome>,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            receiver,
            shutdown_token,
        }
    }

    /// Waits for the next outcome. Returns None once every runner is gone.
    pub async fn next_outcome(&mut self) -> Option<TaskOutcome> {
        self.receiver.recv().await
    }

    pub async fn run(mut self) {
        info!("Task supervisor started");
        loop {
            tokio::select! {
                biased;
                outcome = self.receiver.recv() => match outcome {
                    Some(outcome) => Self::record(&outcome),
                    None => break,
                },
                _ = self.shutdown_token.cancelled() => {
                    info!("Task supervisor received shutdown signal");
                    break;
                }
            }
        }
        while let Ok(outcome) = self.receiver.try_recv() {
            Self::record(&outcome);
        }
        info!("Task supervisor stopped");
    }

    fn record(outcome: &TaskOutcome) {
        match &outcome.status {
            TaskStatus::Completed => info!(
                "Task {} (cycle {}) completed in {:?}",
                outcome.task, outcome.cycle, outcome.elapsed
            ),
            TaskStatus::Cancelled => info!(
                "Task {} (cycle {}) was cancelled after {:?}",
                outcome.task, outcome.cycle, outcome.elapsed
            ),
            TaskStatus::Failed(msg) => warn!(
                "Task {} (cycle {}) failed after {:?}: {}",
                outcome.task, outcome.cycle, outcome.elapsed, msg
            ),
            TaskStatus::Panicked(msg) => error!(
                "Task {} (cycle {}) panicked after {:?}: {}",
                outcome.task, outcome.cycle, outcome.elapsed, msg
            ),
        }
        metrics::record_task_execution(
            &outcome.task,
            outcome.mode.label(),
            outcome.status.label(),
            outcome.elapsed,
        );
    }
}

/// Creates a runner and the supervisor listening to it. The context's token
/// is the root: cancelling it stops every task and the supervisor.
pub fn create_task_runner(context: TaskContext) -> (TaskRunner, TaskSupervisor) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let shutdown_token = context.cancellation_token.clone();
    let runner = TaskRunner::new(context, sender);
    let supervisor = TaskSupervisor::new(receiver, shutdown_token);
    (runner, supervisor)
}
