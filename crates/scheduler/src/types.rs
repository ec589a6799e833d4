use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tasklane_queue::QueueStrategy;

use crate::error::{SchedulerError, TaskFailure};

/// How many units may run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawConcurrency", into = "String")]
pub enum Concurrency {
    /// At most `n` live units.
    Bounded(NonZeroUsize),
    /// Every submission is admitted immediately.
    #[default]
    Unbounded,
}

impl Concurrency {
    /// Bounded limit; `0` is a configuration error.
    pub fn bounded(n: usize) -> Result<Self, SchedulerError> {
        NonZeroUsize::new(n)
            .map(Concurrency::Bounded)
            .ok_or_else(|| SchedulerError::InvalidConcurrency(n.to_string()))
    }

    /// Interpret a floating-point limit: truncated toward zero, must be at
    /// least 1. Positive infinity means unbounded; NaN is rejected.
    pub fn from_f64(value: f64) -> Result<Self, SchedulerError> {
        if value.is_nan() {
            return Err(SchedulerError::InvalidConcurrency(value.to_string()));
        }
        if value == f64::INFINITY {
            return Ok(Concurrency::Unbounded);
        }
        let truncated = value.trunc();
        if truncated < 1.0 {
            return Err(SchedulerError::InvalidConcurrency(value.to_string()));
        }
        if truncated >= usize::MAX as f64 {
            return Ok(Concurrency::Unbounded);
        }
        Self::bounded(truncated as usize)
    }

    /// Whether a new unit may start when `live` units are already running.
    pub fn admits(&self, live: usize) -> bool {
        match self {
            Concurrency::Bounded(n) => live < n.get(),
            Concurrency::Unbounded => true,
        }
    }

    /// The numeric limit, or `None` when unbounded.
    pub fn limit(&self) -> Option<usize> {
        match self {
            Concurrency::Bounded(n) => Some(n.get()),
            Concurrency::Unbounded => None,
        }
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concurrency::Bounded(n) => write!(f, "{n}"),
            Concurrency::Unbounded => f.write_str("unbounded"),
        }
    }
}

impl FromStr for Concurrency {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_ascii_lowercase();
        match text.as_str() {
            "unbounded" | "unlimited" | "infinity" | "inf" => Ok(Concurrency::Unbounded),
            _ => {
                let value: f64 = text
                    .parse()
                    .map_err(|_| SchedulerError::InvalidConcurrency(s.trim().to_string()))?;
                Self::from_f64(value)
            }
        }
    }
}

impl From<Concurrency> for String {
    fn from(c: Concurrency) -> Self {
        c.to_string()
    }
}

/// What a config file may contain for `max_concurrency`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawConcurrency {
    Int(i64),
    Float(f64),
    Text(String),
}

impl TryFrom<RawConcurrency> for Concurrency {
    type Error = SchedulerError;

    fn try_from(raw: RawConcurrency) -> Result<Self, Self::Error> {
        match raw {
            RawConcurrency::Int(n) => usize::try_from(n)
                .map_err(|_| SchedulerError::InvalidConcurrency(n.to_string()))
                .and_then(Concurrency::bounded),
            RawConcurrency::Float(f) => Concurrency::from_f64(f),
            RawConcurrency::Text(s) => s.parse(),
        }
    }
}

// ── Hooks ───────────────────────────────────────────────────────────

/// Called with each task's success value before its slot is reused.
/// An `Err` is recorded as a failure.
pub type ResolveHook<V, E> = Arc<dyn Fn(&V) -> Result<(), E> + Send + Sync>;

/// Called with each task's failure. `Ok(())` swallows it, `Err(sub)`
/// records `sub` in its place.
pub type RejectHook<E> = Arc<dyn Fn(&TaskFailure<E>) -> Result<(), E> + Send + Sync>;

// ── Options ─────────────────────────────────────────────────────────

/// Per-run options passed to [`start`](crate::start).
///
/// `max_concurrency` is kept raw until `start` validates it, so a bad
/// value is reported before any unit runs.
pub struct SchedulerOptions<V, E> {
    pub(crate) max_concurrency: Option<usize>,
    pub(crate) on_resolved: Option<ResolveHook<V, E>>,
    pub(crate) on_rejected: Option<RejectHook<E>>,
    pub(crate) queue_strategy: QueueStrategy,
    pub(crate) name: Option<String>,
}

impl<V, E> SchedulerOptions<V, E> {
    /// Unbounded, no hooks, ring-buffer queue.
    pub fn new() -> Self {
        Self {
            max_concurrency: None,
            on_resolved: None,
            on_rejected: None,
            queue_strategy: QueueStrategy::default(),
            name: None,
        }
    }

    /// Limit the number of simultaneously live units (initializer included).
    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    /// Set an already validated limit.
    pub fn concurrency(mut self, concurrency: Concurrency) -> Self {
        self.max_concurrency = concurrency.limit();
        self
    }

    pub fn on_resolved<F>(mut self, hook: F) -> Self
    where
        F: Fn(&V) -> Result<(), E> + Send + Sync + 'static,
    {
        self.on_resolved = Some(Arc::new(hook));
        self
    }

    pub fn on_rejected<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TaskFailure<E>) -> Result<(), E> + Send + Sync + 'static,
    {
        self.on_rejected = Some(Arc::new(hook));
        self
    }

    pub fn queue_strategy(mut self, strategy: QueueStrategy) -> Self {
        self.queue_strategy = strategy;
        self
    }

    /// Label attached to this run's log lines.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub(crate) fn resolve_concurrency(&self) -> Result<Concurrency, SchedulerError> {
        match self.max_concurrency {
            Some(n) => Concurrency::bounded(n),
            None => Ok(Concurrency::Unbounded),
        }
    }
}

impl<V, E> Default for SchedulerOptions<V, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, E> fmt::Debug for SchedulerOptions<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerOptions")
            .field("max_concurrency", &self.max_concurrency)
            .field("on_resolved", &self.on_resolved.is_some())
            .field("on_rejected", &self.on_rejected.is_some())
            .field("queue_strategy", &self.queue_strategy)
            .field("name", &self.name)
            .finish()
    }
}
