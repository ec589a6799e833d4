use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::info;
use uuid::Uuid;

use tasklane_queue::PendingQueue;

use crate::error::{AggregateError, SchedulerError, TaskFailure};
use crate::handle::Completion;
use crate::metrics::SchedulerStats;
use crate::types::{Concurrency, RejectHook, ResolveHook, SchedulerOptions};

use super::execution;

pub(crate) type TaskFuture<V, E> = BoxFuture<'static, Result<V, E>>;

/// Settles the run's [`Completion`] given the failures captured so far.
/// Installed by the initializer lane once the initializer has finished.
pub(crate) type Finisher<E> = Box<dyn FnOnce(Vec<TaskFailure<E>>) + Send>;

/// A submitted task plus the sender that settles its [`TaskHandle`](crate::TaskHandle).
pub(crate) struct TaskEntry<V, E> {
    pub(crate) seq: u64,
    pub(crate) run: Box<dyn FnOnce() -> TaskFuture<V, E> + Send>,
    pub(crate) reply: oneshot::Sender<Result<V, TaskFailure<E>>>,
}

pub(crate) struct Hooks<V, E> {
    pub(crate) on_resolved: Option<ResolveHook<V, E>>,
    pub(crate) on_rejected: Option<RejectHook<E>>,
}

impl<V, E> Hooks<V, E> {
    pub(crate) fn none() -> Self {
        Self {
            on_resolved: None,
            on_rejected: None,
        }
    }
}

impl<V, E> Clone for Hooks<V, E> {
    fn clone(&self) -> Self {
        Self {
            on_resolved: self.on_resolved.clone(),
            on_rejected: self.on_rejected.clone(),
        }
    }
}

/// Everything mutated by admit/settle. Only touched under `Inner::state`.
pub(crate) struct State<V, E> {
    /// Units currently occupying a slot. Starts at 1 for the initializer;
    /// the run is locked for good once it drops to 0.
    pub(crate) live: usize,
    pub(crate) pending: PendingQueue<TaskEntry<V, E>>,
    /// Captured failures, in settlement order.
    pub(crate) failures: Vec<TaskFailure<E>>,
    pub(crate) hooks: Hooks<V, E>,
    pub(crate) finish: Option<Finisher<E>>,
    pub(crate) next_seq: u64,
    pub(crate) stats: SchedulerStats,
}

impl<V, E> State<V, E> {
    pub(crate) fn is_locked(&self) -> bool {
        self.live == 0
    }
}

pub(crate) struct Inner<V, E> {
    pub(crate) id: Uuid,
    /// Name if one was configured, otherwise the id.
    pub(crate) label: String,
    pub(crate) max_concurrency: Concurrency,
    pub(crate) runtime: Handle,
    pub(crate) state: Mutex<State<V, E>>,
}

impl<V, E> Inner<V, E> {
    /// No user code ever runs under this lock, so a poisoned guard still
    /// holds consistent state.
    pub(crate) fn lock(&self) -> MutexGuard<'_, State<V, E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Submission capability handed to the initializer and, by cloning, to any
/// task that wants to schedule more work.
pub struct Scheduler<V, E> {
    pub(crate) inner: Arc<Inner<V, E>>,
}

impl<V, E> Clone for Scheduler<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, E> fmt::Debug for Scheduler<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("Scheduler")
            .field("id", &self.inner.id)
            .field("max_concurrency", &self.inner.max_concurrency)
            .field("live", &state.live)
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl<V, E> Scheduler<V, E> {
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn max_concurrency(&self) -> Concurrency {
        self.inner.max_concurrency
    }

    /// Units currently running, initializer included.
    pub fn live_units(&self) -> usize {
        self.inner.lock().live
    }

    /// Tasks waiting for a free slot.
    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// True once every unit has settled; `schedule` fails from then on.
    pub fn is_locked(&self) -> bool {
        self.inner.lock().is_locked()
    }

    /// Snapshot of the run's accounting.
    pub fn stats(&self) -> SchedulerStats {
        self.inner.lock().stats.clone()
    }
}

/// Start a run: `initializer` becomes the first live unit and receives the
/// [`Scheduler`] used to submit further tasks.
///
/// Fails synchronously, before anything runs, when `max_concurrency` is 0
/// or no Tokio runtime is available. The initializer itself is not invoked
/// inside this call.
pub fn start<T, V, E, I, Fut>(
    initializer: I,
    options: SchedulerOptions<V, E>,
) -> Result<Completion<T, E>, SchedulerError>
where
    I: FnOnce(Scheduler<V, E>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    V: Send + 'static,
    E: Clone + Send + 'static,
{
    let max_concurrency = options.resolve_concurrency()?;
    let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;

    let id = Uuid::new_v4();
    let label = options.name.clone().unwrap_or_else(|| id.to_string());
    let state = State {
        live: 1,
        pending: PendingQueue::new(options.queue_strategy),
        failures: Vec::new(),
        hooks: Hooks {
            on_resolved: options.on_resolved,
            on_rejected: options.on_rejected,
        },
        finish: None,
        next_seq: 1,
        stats: SchedulerStats::new(id, options.name, max_concurrency),
    };
    let inner = Arc::new(Inner {
        id,
        label,
        max_concurrency,
        runtime,
        state: Mutex::new(state),
    });

    info!(
        scheduler = %inner.label,
        max_concurrency = %max_concurrency,
        queue = %options.queue_strategy,
        "scheduler started"
    );

    let (tx, rx) = oneshot::channel::<Result<T, AggregateError<E>>>();
    let scheduler = Scheduler {
        inner: Arc::clone(&inner),
    };
    inner
        .runtime
        .spawn(execution::run_initializer(Arc::clone(&inner), initializer, scheduler, tx));

    Ok(Completion::new(id, rx))
}
