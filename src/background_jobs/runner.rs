use super::context::TaskContext;
use super::supervisor::{TaskOutcome, TaskStatus};
use super::task::{TaskAction, TaskError, TaskMode};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Runs task actions off the request path.
///
/// Cheap to clone; every clone reports to the same supervisor.
#[derive(Clone)]
pub struct TaskRunner {
    context: TaskContext,
    outcomes: mpsc::UnboundedSender<TaskOutcome>,
    runtime: Handle,
}

impl TaskRunner {
    /// Must be called from within a Tokio runtime.
    pub(super) fn new(context: TaskContext, outcomes: mpsc::UnboundedSender<TaskOutcome>) -> Self {
        Self {
            context,
            outcomes,
            runtime: Handle::current(),
        }
    }

    /// Runs `action` once, as soon as possible, without blocking the caller.
    pub fn run_immediate(&self, name: impl Into<String>, action: TaskAction) -> TaskHandle {
        let name = name.into();
        let token = self.context.cancellation_token.child_token();
        let template = self.context.clone();
        let outcomes = self.outcomes.clone();

        let task_name = name.clone();
        let task_token = token.clone();
        let join = self.runtime.spawn(async move {
            let outcome = if task_token.is_cancelled() {
                TaskOutcome {
                    task: task_name,
                    cycle: 1,
                    mode: TaskMode::Immediate,
                    status: TaskStatus::Cancelled,
                    elapsed: Duration::ZERO,
                }
            } else {
                let ctx = template.fork(&task_token);
                execute_once(task_name, 1, TaskMode::Immediate, action, ctx).await
            };
            let _ = outcomes.send(outcome);
        });

        debug!("Queued immediate task {}", name);
        TaskHandle { name, token, join }
    }

    /// Runs `action` every `delay` until the returned handle is cancelled or
    /// the runner shuts down.
    ///
    /// The next cycle is armed only after the previous one has finished, so
    /// cycles never overlap. A failed or panicked cycle is reported and the
    /// task is re-armed as usual.
    pub fn run_periodic(
        &self,
        name: impl Into<String>,
        action: TaskAction,
        delay: Duration,
    ) -> TaskHandle {
        let name = name.into();
        let token = self.context.cancellation_token.child_token();
        let template = self.context.clone();
        let outcomes = self.outcomes.clone();
        let mode = TaskMode::Periodic(delay);

        let task_name = name.clone();
        let task_token = token.clone();
        let join = self.runtime.spawn(async move {
            let mut cycle = 0u64;
            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                cycle += 1;
                let ctx = template.fork(&task_token);
                let outcome =
                    execute_once(task_name.clone(), cycle, mode, action.clone(), ctx).await;
                let _ = outcomes.send(outcome);
            }
            info!("Periodic task {} stopped after {} cycles", task_name, cycle);
        });

        info!("Scheduled periodic task {} every {:?}", name, delay);
        TaskHandle { name, token, join }
    }

    /// Cancels every task started by this runner.
    pub fn shutdown(&self) {
        self.context.cancellation_token.cancel();
    }
}

async fn execute_once(
    task: String,
    cycle: u64,
    mode: TaskMode,
    action: TaskAction,
    ctx: TaskContext,
) -> TaskOutcome {
    let start_time = Instant::now();
    let result = tokio::task::spawn_blocking(move || action(&ctx)).await;
    let status = match result {
        Ok(Ok(())) => TaskStatus::Completed,
        Ok(Err(TaskError::Cancelled)) => TaskStatus::Cancelled,
        Ok(Err(e)) => TaskStatus::Failed(e.to_string()),
        Err(e) => TaskStatus::Panicked(e.to_string()),
    };
    TaskOutcome {
        task,
        cycle,
        mode,
        status,
        elapsed: start_time.elapsed(),
    }
}

/// Handle to a running task. Dropping it does not stop the task.
#[derive(Debug)]
pub struct TaskHandle {
    name: String,
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Prevents any further cycle. A cycle already running sees its context
    /// token cancelled and finishes on its own.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits until the task has stopped and its last outcome was sent.
    pub async fn join(self) -> Result<(), TaskError> {
        self.join
            .await
            .map_err(|e| TaskError::ExecutionFailed(format!("Task {}: {}", self.name, e)))
    }
}
