use serde::Serialize;

use tasklane_scheduler::{AggregateError, SchedulerStats};

/// JSON summary printed after a run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub outcome: Outcome,
    /// Initializer value, present when the run resolved.
    pub value: Option<u64>,
    pub failures: Vec<String>,
    pub expected_nodes: u64,
    pub visited_nodes: u64,
    pub swallowed_failures: u64,
    pub stats: SchedulerStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Resolved,
    Failed,
}

impl RunReport {
    pub fn failure_messages(err: &AggregateError<String>) -> Vec<String> {
        err.failures().iter().map(ToString::to_string).collect()
    }
}
