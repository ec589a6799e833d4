use std::path::Path;

use serde::{Deserialize, Serialize};
use tasklane_queue::QueueStrategy;

use crate::error::SchedulerError;
use crate::types::{Concurrency, SchedulerOptions};

/// File/env configuration for a scheduler run, typically parsed from TOML.
///
/// ```toml
/// max_concurrency = 8        # or "unbounded"
/// queue = "ring"             # or "deque"
/// name = "crawler"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum simultaneously live units.
    #[serde(default)]
    pub max_concurrency: Concurrency,

    /// Storage for tasks waiting on a slot.
    #[serde(default)]
    pub queue: QueueStrategy,

    /// Optional label for log lines.
    #[serde(default)]
    pub name: Option<String>,
}

impl SchedulerConfig {
    /// Parse config from a TOML string, then apply env overrides.
    pub fn from_toml(toml_str: &str) -> Result<Self, SchedulerError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchedulerError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Defaults plus env overrides, for runs without a config file.
    pub fn from_env() -> Result<Self, SchedulerError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// - `TASKLANE_MAX_CONCURRENCY` → `max_concurrency`
    /// - `TASKLANE_QUEUE` → `queue`
    /// - `TASKLANE_NAME` → `name`
    ///
    /// Unlike missing keys, a malformed override is an error.
    fn apply_env_overrides(&mut self) -> Result<(), SchedulerError> {
        if let Some(v) = env_opt("TASKLANE_MAX_CONCURRENCY") {
            self.max_concurrency = v.parse()?;
        }
        if let Some(v) = env_opt("TASKLANE_QUEUE") {
            self.queue = v.parse()?;
        }
        if let Some(v) = env_opt("TASKLANE_NAME") {
            self.name = Some(v);
        }
        Ok(())
    }

    /// Build run options from this config. Hooks are attached by the caller.
    pub fn options<V, E>(&self) -> SchedulerOptions<V, E> {
        let opts = SchedulerOptions::new()
            .concurrency(self.max_concurrency)
            .queue_strategy(self.queue);
        match &self.name {
            Some(name) => opts.name(name.clone()),
            None => opts,
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}
