//! Recursive fan-out tree: every node may schedule more nodes from inside
//! its own body.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::trace;

use tasklane_scheduler::{Scheduler, SchedulerError};

/// Shape of the generated tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeShape {
    pub depth: u32,
    pub fanout: u32,
    pub delay: Duration,
    pub jitter_ms: u64,
    pub fail_every: u64,
}

impl TreeShape {
    /// Nodes below the initializer: fanout + fanout^2 + ... + fanout^depth.
    pub fn expected_nodes(&self) -> u64 {
        (1..=self.depth)
            .map(|level| u64::from(self.fanout).saturating_pow(level))
            .fold(0_u64, u64::saturating_add)
    }
}

/// Counters shared by every node of one run.
#[derive(Debug, Default)]
pub struct Tally {
    pub visited: AtomicU64,
    pub swallowed: AtomicU64,
}

/// Schedule the children of a node sitting at `level`.
pub fn schedule_children(
    scheduler: &Scheduler<u64, String>,
    shape: TreeShape,
    level: u32,
    tally: &Arc<Tally>,
) -> Result<(), SchedulerError> {
    if level >= shape.depth {
        return Ok(());
    }
    for _ in 0..shape.fanout {
        let child = scheduler.clone();
        let tally = Arc::clone(tally);
        scheduler.schedule(move || visit(child, shape, level + 1, tally))?;
    }
    Ok(())
}

async fn visit(
    scheduler: Scheduler<u64, String>,
    shape: TreeShape,
    level: u32,
    tally: Arc<Tally>,
) -> Result<u64, String> {
    let index = tally.visited.fetch_add(1, Ordering::SeqCst) + 1;
    trace!(index, level, "visiting node");

    // Children go in before the work so the queue fills while we sleep.
    schedule_children(&scheduler, shape, level, &tally).map_err(|e| e.to_string())?;

    tokio::time::sleep(shape.delay + jitter(shape.jitter_ms)).await;

    if shape.fail_every > 0 && index % shape.fail_every == 0 {
        return Err(format!("node {index} at level {level} failed"));
    }
    Ok(index)
}

fn jitter(max_ms: u64) -> Duration {
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}
