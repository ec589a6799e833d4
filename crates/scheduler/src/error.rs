//! Error types for the scheduler.

use std::fmt;

use thiserror::Error;

use tasklane_queue::QueueError;

/// Synchronous failures raised by [`start`](crate::start),
/// [`Scheduler::schedule`](crate::Scheduler::schedule), and config loading.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid max concurrency: {0} (expected an integer >= 1 or \"unbounded\")")]
    InvalidConcurrency(String),

    #[error("scheduler is locked: every unit has already settled")]
    Locked,

    #[error("no tokio runtime available to drive tasks")]
    NoRuntime,

    #[error("queue config error: {0}")]
    Queue(#[from] QueueError),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),
}

/// Why a single unit of work did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskFailure<E> {
    /// The task (or a hook) returned an error.
    #[error("{0}")]
    Failed(E),

    /// The task, initializer, or a hook panicked.
    #[error("panicked: {0}")]
    Panicked(String),

    /// The unit was dropped before it settled, e.g. because the runtime
    /// shut down underneath it.
    #[error("dropped before it settled")]
    Dropped,
}

impl<E> TaskFailure<E> {
    /// The error value, if this failure came from an `Err` return.
    pub fn error(&self) -> Option<&E> {
        match self {
            TaskFailure::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_error(self) -> Option<E> {
        match self {
            TaskFailure::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, TaskFailure::Panicked(_))
    }

    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        TaskFailure::Panicked(message)
    }
}

/// Every failure captured during one scheduler run, in settlement order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateError<E> {
    failures: Vec<TaskFailure<E>>,
}

impl<E> AggregateError<E> {
    pub fn new(failures: Vec<TaskFailure<E>>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[TaskFailure<E>] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<TaskFailure<E>> {
        self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Only the `Failed(E)` values, skipping panics and drops.
    pub fn errors(&self) -> impl Iterator<Item = &E> {
        self.failures.iter().filter_map(TaskFailure::error)
    }
}

impl<E: fmt::Display> fmt::Display for AggregateError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failures.as_slice() {
            [] => write!(f, "no failures recorded"),
            [only] => write!(f, "1 unit failed: {only}"),
            [first, rest @ ..] => {
                write!(f, "{} units failed, first: {first}", rest.len() + 1)
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for AggregateError<E> {}
