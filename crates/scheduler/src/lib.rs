//! Bounded-concurrency task scheduler.
//!
//! [`start`] runs an initializer as the first live unit and hands it a
//! [`Scheduler`] through which it (and every task it spawns, transitively)
//! may submit more work. At most `max_concurrency` units run at once; extra
//! submissions wait in a FIFO and take over slots as they free up. Task
//! failures are collected in settlement order and surface together through
//! the [`Completion`] once every unit has finished.
//!
//! ```
//! use tasklane_scheduler::{Scheduler, SchedulerOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let completion = tasklane_scheduler::start(
//!     |scheduler: Scheduler<u32, String>| async move {
//!         for i in 1..=5 {
//!             scheduler
//!                 .schedule(move || async move { Ok(i) })
//!                 .map_err(|e| e.to_string())?;
//!         }
//!         Ok::<_, String>(0)
//!     },
//!     SchedulerOptions::new().max_concurrency(2),
//! )?;
//! assert_eq!(completion.await?, 0);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod runner;
pub mod types;

pub use config::SchedulerConfig;
pub use error::{AggregateError, SchedulerError, TaskFailure};
pub use handle::{Completion, TaskHandle};
pub use metrics::SchedulerStats;
pub use runner::{Scheduler, start};
pub use tasklane_queue::QueueStrategy;
pub use types::{Concurrency, RejectHook, ResolveHook, SchedulerOptions};
