mod cli;
mod config;
mod report;
mod workload;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};

use tasklane_scheduler::{Scheduler, SchedulerStats, start};

use crate::cli::CliArgs;
use crate::report::{Outcome, RunReport};
use crate::workload::{Tally, TreeShape, schedule_children};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = config::resolve(&args).context("failed to resolve scheduler configuration")?;

    let shape = TreeShape {
        depth: args.depth,
        fanout: args.fanout,
        delay: Duration::from_millis(args.delay_ms),
        jitter_ms: args.jitter_ms,
        fail_every: args.fail_every,
    };
    info!(
        max_concurrency = %config.max_concurrency,
        queue = %config.queue,
        depth = shape.depth,
        fanout = shape.fanout,
        expected_nodes = shape.expected_nodes(),
        "starting workload"
    );

    let tally = Arc::new(Tally::default());
    let mut options = config.options::<u64, String>();
    if args.swallow_failures {
        let swallowed = Arc::clone(&tally);
        options = options.on_rejected(move |failure| {
            warn!(%failure, "swallowing task failure");
            swallowed.swallowed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }

    // The initializer hands its scheduler out so stats survive the run.
    let handle: Arc<Mutex<Option<Scheduler<u64, String>>>> = Arc::default();
    let init_handle = Arc::clone(&handle);
    let init_tally = Arc::clone(&tally);
    let completion = start(
        move |scheduler: Scheduler<u64, String>| async move {
            *init_handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(scheduler.clone());
            schedule_children(&scheduler, shape, 0, &init_tally).map_err(|e| e.to_string())?;
            Ok::<u64, String>(0)
        },
        options,
    )
    .context("failed to start scheduler")?;

    let result = completion.await;
    let stats = handle
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .map(Scheduler::stats)
        .context("initializer never ran")?;

    let report = build_report(result, shape, &tally, stats);
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");

    if report.outcome == Outcome::Failed {
        bail!("{} unit(s) failed", report.failures.len());
    }
    Ok(())
}

fn build_report(
    result: Result<u64, tasklane_scheduler::AggregateError<String>>,
    shape: TreeShape,
    tally: &Tally,
    stats: SchedulerStats,
) -> RunReport {
    let (outcome, value, failures) = match result {
        Ok(value) => (Outcome::Resolved, Some(value), Vec::new()),
        Err(err) => (Outcome::Failed, None, RunReport::failure_messages(&err)),
    };
    RunReport {
        outcome,
        value,
        failures,
        expected_nodes: shape.expected_nodes(),
        visited_nodes: tally.visited.load(Ordering::SeqCst),
        swallowed_failures: tally.swallowed.load(Ordering::SeqCst),
        stats,
    }
}
