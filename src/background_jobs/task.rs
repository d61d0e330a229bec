use super::context::TaskContext;
use super::runner::{TaskHandle, TaskRunner};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The unit of deferred work. Actions run on a blocking thread and receive a
/// freshly forked context on every invocation.
pub type TaskAction = Arc<dyn Fn(&TaskContext) -> Result<(), TaskError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMode {
    /// Runs once, as soon as a blocking thread is free.
    Immediate,
    /// Runs every `delay`, measured from the end of the previous cycle.
    Periodic(Duration),
}

impl TaskMode {
    pub fn label(&self) -> &'static str {
        match self {
            TaskMode::Immediate => "immediate",
            TaskMode::Periodic(_) => "periodic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// A worker was started without an action.
    MissingAction(String),
    /// A periodic worker was started with a zero delay.
    InvalidDelay(String),
    ExecutionFailed(String),
    Cancelled,
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::MissingAction(name) => write!(f, "Worker {} has no action", name),
            TaskError::InvalidDelay(name) => {
                write!(f, "Worker {} needs a non-zero delay", name)
            }
            TaskError::ExecutionFailed(msg) => write!(f, "Execution failed: {}", msg),
            TaskError::Cancelled => write!(f, "Task was cancelled"),
        }
    }
}

impl std::error::Error for TaskError {}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        TaskError::ExecutionFailed(format!("{:#}", err))
    }
}

/// A delay expressed in a single unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ticker {
    Seconds(u64),
    Minutes(u64),
    Hours(u64),
    Days(u64),
}

impl From<Ticker> for Duration {
    fn from(ticker: Ticker) -> Duration {
        match ticker {
            Ticker::Seconds(s) => Duration::from_secs(s),
            Ticker::Minutes(m) => Duration::from_secs(m * 60),
            Ticker::Hours(h) => Duration::from_secs(h * 60 * 60),
            Ticker::Days(d) => Duration::from_secs(d * 24 * 60 * 60),
        }
    }
}

/// Builder for a named task.
///
/// ```ignore
/// let handle = Worker::new("auth_token_pruning")
///     .with_action(|ctx| prune(ctx))
///     .every(Ticker::Hours(24))
///     .start(&runner)?;
/// ```
pub struct Worker {
    name: String,
    action: Option<TaskAction>,
    delay: Option<Duration>,
}

impl Worker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: None,
            delay: None,
        }
    }

    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: Fn(&TaskContext) -> Result<(), TaskError> + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    /// Makes the worker periodic.
    pub fn every(mut self, delay: impl Into<Duration>) -> Self {
        self.delay = Some(delay.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> TaskMode {
        match self.delay {
            Some(delay) => TaskMode::Periodic(delay),
            None => TaskMode::Immediate,
        }
    }

    /// Hands the worker to `runner`. Fails without scheduling anything when
    /// no action was configured.
    pub fn start(self, runner: &TaskRunner) -> Result<TaskHandle, TaskError> {
        let mode = self.mode();
        let action = self.action.ok_or(TaskError::MissingAction(self.name.clone()))?;
        match mode {
            TaskMode::Immediate => Ok(runner.run_immediate(self.name, action)),
            TaskMode::Periodic(delay) if delay.is_zero() => Err(TaskError::InvalidDelay(self.name)),
            TaskMode::Periodic(delay) => Ok(runner.run_periodic(self.name, action, delay)),
        }
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("has_action", &self.action.is_some())
            .field("delay", &self.delay)
            .finish()
    }
}
