use anyhow::{Context, Result};
use tracing::debug;

use tasklane_scheduler::{Concurrency, QueueStrategy, SchedulerConfig};

use crate::cli::CliArgs;

/// Resolve the scheduler config: file (or env-only defaults), then CLI flags.
pub fn resolve(args: &CliArgs) -> Result<SchedulerConfig> {
    let mut config = match args.config.as_deref() {
        Some(path) => {
            debug!(path, "loading scheduler config");
            SchedulerConfig::from_file(path)
                .with_context(|| format!("failed to load config from {path}"))?
        }
        None => SchedulerConfig::from_env().context("invalid TASKLANE_* environment")?,
    };

    if let Some(raw) = args.max_concurrency.as_deref() {
        config.max_concurrency = raw
            .parse::<Concurrency>()
            .context("invalid --max-concurrency")?;
    }
    if let Some(raw) = args.queue.as_deref() {
        config.queue = raw.parse::<QueueStrategy>().context("invalid --queue")?;
    }

    Ok(config)
}
