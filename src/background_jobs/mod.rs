//! Deferred task execution.
//!
//! Request handlers hand work to a [`TaskRunner`] either once (`run_immediate`)
//! or on a fixed delay (`run_periodic`). Actions run on blocking threads with a
//! fresh [`TaskContext`] each time, and every outcome is reported to the
//! [`TaskSupervisor`].

mod context;
pub mod jobs;
mod runner;
mod supervisor;
mod task;

pub use context::TaskContext;
pub use jobs::AuthTokenPruningJob;
pub use runner::{TaskHandle, TaskRunner};
pub use supervisor::{create_task_runner, TaskOutcome, TaskStatus, TaskSupervisor};
pub use task::{TaskAction, TaskError, TaskMode, Ticker, Worker};
