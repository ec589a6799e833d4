use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::error::{AggregateError, TaskFailure};

use super::core::{Finisher, Hooks, Inner, Scheduler, TaskEntry};

/// Call `f` and await the future it returns, turning an `Err` or a panic at
/// either stage into a [`TaskFailure`].
async fn run_guarded<R, E, F, Fut>(f: F) -> Result<R, TaskFailure<E>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let fut = match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(fut) => fut,
        Err(payload) => return Err(TaskFailure::from_panic(payload)),
    };
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(TaskFailure::Failed(e)),
        Err(payload) => Err(TaskFailure::from_panic(payload)),
    }
}

/// Run a hook, mapping its error or panic to the failure to record.
fn run_hook<E>(hook: impl FnOnce() -> Result<(), E>) -> Option<TaskFailure<E>> {
    match std::panic::catch_unwind(AssertUnwindSafe(hook)) {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(TaskFailure::Failed(e)),
        Err(payload) => Some(TaskFailure::from_panic(payload)),
    }
}

/// Decide what, if anything, a task's outcome adds to the aggregate.
fn hook_verdict<V, E: Clone>(
    hooks: &Hooks<V, E>,
    outcome: &Result<V, TaskFailure<E>>,
) -> Option<TaskFailure<E>> {
    match outcome {
        Ok(value) => hooks
            .on_resolved
            .as_ref()
            .and_then(|hook| run_hook(|| hook(value))),
        Err(failure) => match &hooks.on_rejected {
            Some(hook) => run_hook(|| hook(failure)),
            None => Some(failure.clone()),
        },
    }
}

/// Lane for the initializer: runs it, installs the finisher, then keeps
/// serving the queue like any other lane.
pub(super) async fn run_initializer<T, V, E, I, Fut>(
    inner: Arc<Inner<V, E>>,
    initializer: I,
    scheduler: Scheduler<V, E>,
    tx: oneshot::Sender<Result<T, AggregateError<E>>>,
) where
    I: FnOnce(Scheduler<V, E>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    V: Send + 'static,
    E: Clone + Send + 'static,
{
    debug!(scheduler = %inner.label, "initializer started");
    let outcome = run_guarded(move || initializer(scheduler)).await;

    let finish: Finisher<E> = match outcome {
        Ok(value) => {
            debug!(scheduler = %inner.label, "initializer resolved");
            Box::new(move |failures| {
                let result = if failures.is_empty() {
                    Ok(value)
                } else {
                    Err(AggregateError::new(failures))
                };
                let _ = tx.send(result);
            })
        }
        Err(failure) => {
            warn!(
                scheduler = %inner.label,
                error_kind = failure_kind(&failure),
                "initializer failed"
            );
            let mut state = inner.lock();
            state.failures.push(failure);
            state.stats.recorded_failures += 1;
            drop(state);
            Box::new(move |failures| {
                let _ = tx.send(Err(AggregateError::new(failures)));
            })
        }
    };

    inner.lock().finish = Some(finish);

    let next = inner.release_slot();
    inner.drive(next).await;
}

fn failure_kind<E>(failure: &TaskFailure<E>) -> &'static str {
    match failure {
        TaskFailure::Failed(_) => "error",
        TaskFailure::Panicked(_) => "panic",
        TaskFailure::Dropped => "dropped",
    }
}

impl<V, E> Inner<V, E>
where
    V: Send + 'static,
    E: Clone + Send + 'static,
{
    /// Start a new lane on the runtime for a freshly admitted task. The task
    /// never runs inside the caller's stack frame.
    pub(crate) fn spawn_lane(self: &Arc<Self>, entry: TaskEntry<V, E>) {
        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            inner.drive(Some(entry)).await;
        });
    }

    /// Run `next`, then whatever the queue hands this slot, until the queue
    /// is empty and the slot is given back.
    async fn drive(&self, mut next: Option<TaskEntry<V, E>>) {
        while let Some(entry) = next {
            self.run_entry(entry).await;
            next = self.release_slot();
        }
    }

    /// Run one task, apply its hook, then settle its handle.
    async fn run_entry(&self, entry: TaskEntry<V, E>) {
        let TaskEntry { seq, run, reply } = entry;
        debug!(scheduler = %self.label, task = seq, "task started");

        let outcome = run_guarded(run).await;

        let hooks = self.lock().hooks.clone();
        let recorded = hook_verdict(&hooks, &outcome);
        drop(hooks);

        {
            let mut state = self.lock();
            state.stats.record_outcome(outcome.is_ok());
            if let Some(failure) = recorded {
                warn!(
                    scheduler = %self.label,
                    task = seq,
                    error_kind = failure_kind(&failure),
                    "task failure recorded"
                );
                state.failures.push(failure);
                state.stats.recorded_failures += 1;
            }
        }

        debug!(scheduler = %self.label, task = seq, ok = outcome.is_ok(), "task settled");
        // The caller may have dropped its handle; the outcome is still accounted for.
        let _ = reply.send(outcome);
    }

    /// Hand the freed slot to the head of the queue, or give it back.
    ///
    /// Giving back the last slot locks the run and settles the completion.
    pub(crate) fn release_slot(&self) -> Option<TaskEntry<V, E>> {
        let mut state = self.lock();

        if let Some(entry) = state.pending.pop_front() {
            state.stats.pending = state.pending.len();
            debug!(scheduler = %self.label, task = entry.seq, "task dequeued into freed slot");
            return Some(entry);
        }

        state.live -= 1;
        state.stats.live_units = state.live;
        if state.live > 0 {
            return None;
        }

        // Locked from here on: release everything the run was holding.
        let finish = state.finish.take();
        let failures = std::mem::take(&mut state.failures);
        let hooks = std::mem::replace(&mut state.hooks, Hooks::none());
        state.pending.release();
        state.stats.finished_at = Some(Utc::now());
        let stats = state.stats.clone();
        drop(state);
        drop(hooks);

        info!(
            scheduler = %self.label,
            submitted = stats.submitted,
            resolved = stats.resolved,
            rejected = stats.rejected,
            failures = failures.len(),
            peak_live_units = stats.peak_live_units,
            elapsed_ms = stats.elapsed().num_milliseconds(),
            "scheduler settled"
        );

        match finish {
            Some(finish) => finish(failures),
            None => error!(scheduler = %self.label, "settled before the initializer finished"),
        }
        None
    }
}
