use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::types::Concurrency;

/// Accounting snapshot for one scheduler run.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStats {
    /// Instance id, also attached to every log line of the run.
    pub id: Uuid,
    pub name: Option<String>,
    pub max_concurrency: Concurrency,
    /// Units currently running (initializer included).
    pub live_units: usize,
    /// Highest `live_units` ever observed.
    pub peak_live_units: usize,
    /// Tasks waiting for a slot right now.
    pub pending: usize,
    /// Highest queue depth ever observed.
    pub peak_pending: usize,
    /// Tasks accepted by `schedule`.
    pub submitted: u64,
    /// Tasks that started immediately in a fresh slot.
    pub admitted: u64,
    /// Tasks that had to wait in the queue.
    pub queued: u64,
    /// Tasks that produced a value.
    pub resolved: u64,
    /// Tasks that failed or panicked.
    pub rejected: u64,
    /// Failures captured into the aggregate (after hooks).
    pub recorded_failures: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SchedulerStats {
    pub(crate) fn new(id: Uuid, name: Option<String>, max_concurrency: Concurrency) -> Self {
        Self {
            id,
            name,
            max_concurrency,
            live_units: 1,
            peak_live_units: 1,
            pending: 0,
            peak_pending: 0,
            submitted: 0,
            admitted: 0,
            queued: 0,
            resolved: 0,
            rejected: 0,
            recorded_failures: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Record a unit taking a fresh slot.
    pub(crate) fn record_admit(&mut self, live: usize) {
        self.submitted += 1;
        self.admitted += 1;
        self.live_units = live;
        self.peak_live_units = self.peak_live_units.max(live);
    }

    /// Record a task parked in the queue.
    pub(crate) fn record_queued(&mut self, pending: usize) {
        self.submitted += 1;
        self.queued += 1;
        self.pending = pending;
        self.peak_pending = self.peak_pending.max(pending);
    }

    pub(crate) fn record_outcome(&mut self, succeeded: bool) {
        if succeeded {
            self.resolved += 1;
        } else {
            self.rejected += 1;
        }
    }

    /// Whether the run has fully settled.
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Wall-clock run time so far (or in total, once finished).
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.started_at
    }
}
