use clap::Parser;

/// Run a synthetic recursive fan-out workload through the tasklane scheduler.
///
/// Every node of the tree sleeps for a while, optionally fails, and
/// schedules `fanout` children until `depth` is reached. A JSON report with
/// the aggregate outcome and scheduler stats is printed on stdout.
#[derive(Parser, Debug)]
#[command(name = "tasklane", version, about)]
pub struct CliArgs {
    /// Path to a TOML scheduler config (max_concurrency, queue, name)
    #[arg(long, env = "TASKLANE_CONFIG")]
    pub config: Option<String>,

    /// Maximum concurrently running units, or "unbounded" (overrides config)
    #[arg(long)]
    pub max_concurrency: Option<String>,

    /// Pending-queue storage: ring or deque (overrides config)
    #[arg(long)]
    pub queue: Option<String>,

    /// Depth of the task tree below the initializer
    #[arg(long, default_value_t = 3)]
    pub depth: u32,

    /// Children scheduled by every node above the leaves
    #[arg(long, default_value_t = 3)]
    pub fanout: u32,

    /// Base per-node work time in milliseconds
    #[arg(long, default_value_t = 10)]
    pub delay_ms: u64,

    /// Random extra work time added to each node, up to this many milliseconds
    #[arg(long, default_value_t = 0)]
    pub jitter_ms: u64,

    /// Fail every Nth node (0 = never)
    #[arg(long, default_value_t = 0)]
    pub fail_every: u64,

    /// Swallow task failures in the rejection hook instead of aggregating them
    #[arg(long)]
    pub swallow_failures: bool,

    /// Pretty-print the JSON report
    #[arg(long)]
    pub pretty: bool,
}
