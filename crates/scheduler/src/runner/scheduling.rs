use std::future::Future;

use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::SchedulerError;
use crate::handle::TaskHandle;

use super::core::{Scheduler, TaskEntry};

impl<V, E> Scheduler<V, E>
where
    V: Send + 'static,
    E: Clone + Send + 'static,
{
    /// Submit a task to this run.
    ///
    /// With a free slot the task is admitted and started on the runtime;
    /// otherwise it waits in FIFO order for a slot to free up. Either way it
    /// never runs before this call returns. Fails with
    /// [`SchedulerError::Locked`] once every unit of the run has settled.
    pub fn schedule<F, Fut>(&self, task: F) -> Result<TaskHandle<V, E>, SchedulerError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let mut entry = TaskEntry {
            seq: 0,
            run: Box::new(move || task().boxed()),
            reply,
        };

        let mut state = self.inner.lock();
        if state.is_locked() {
            return Err(SchedulerError::Locked);
        }
        entry.seq = state.next_seq;
        state.next_seq += 1;

        if self.inner.max_concurrency.admits(state.live) {
            state.live += 1;
            let live = state.live;
            state.stats.record_admit(live);
            drop(state);
            debug!(scheduler = %self.inner.label, task = entry.seq, live, "task admitted");
            self.inner.spawn_lane(entry);
        } else {
            let seq = entry.seq;
            state.pending.push_back(entry);
            let depth = state.pending.len();
            state.stats.record_queued(depth);
            drop(state);
            debug!(scheduler = %self.inner.label, task = seq, depth, "task queued");
        }

        Ok(TaskHandle::new(rx))
    }

    /// Submit a synchronous task. It still runs on a lane, never inside
    /// this call.
    pub fn schedule_fn<F>(&self, task: F) -> Result<TaskHandle<V, E>, SchedulerError>
    where
        F: FnOnce() -> Result<V, E> + Send + 'static,
    {
        self.schedule(move || async move { task() })
    }
}
