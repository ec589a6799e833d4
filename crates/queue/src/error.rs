//! Queue error types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("unknown queue strategy: {0} (expected \"ring\" or \"deque\")")]
    UnknownStrategy(String),
}
