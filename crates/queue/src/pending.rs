//! Strategy-selectable FIFO for tasks waiting on a concurrency slot.
//!
//! [`QueueStrategy::Ring`] stores entries in a [`RingQueue`];
//! [`QueueStrategy::Deque`] is the plain `VecDeque` reference variant.
//! Both give the same observable ordering.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QueueError;
use crate::ring::RingQueue;

/// Which storage backs a [`PendingQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStrategy {
    /// Power-of-two circular buffer, doubled past 2/3 occupancy.
    #[default]
    Ring,
    /// `std::collections::VecDeque`.
    Deque,
}

impl fmt::Display for QueueStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueStrategy::Ring => f.write_str("ring"),
            QueueStrategy::Deque => f.write_str("deque"),
        }
    }
}

impl FromStr for QueueStrategy {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ring" => Ok(QueueStrategy::Ring),
            "deque" | "vecdeque" => Ok(QueueStrategy::Deque),
            other => Err(QueueError::UnknownStrategy(other.to_string())),
        }
    }
}

/// FIFO of pending entries with a runtime-selected storage strategy.
pub enum PendingQueue<T> {
    Ring(RingQueue<T>),
    Deque(VecDeque<T>),
}

impl<T> PendingQueue<T> {
    pub fn new(strategy: QueueStrategy) -> Self {
        match strategy {
            QueueStrategy::Ring => PendingQueue::Ring(RingQueue::new()),
            QueueStrategy::Deque => PendingQueue::Deque(VecDeque::new()),
        }
    }

    pub fn strategy(&self) -> QueueStrategy {
        match self {
            PendingQueue::Ring(_) => QueueStrategy::Ring,
            PendingQueue::Deque(_) => QueueStrategy::Deque,
        }
    }

    pub fn push_back(&mut self, value: T) {
        match self {
            PendingQueue::Ring(q) => q.push_back(value),
            PendingQueue::Deque(q) => q.push_back(value),
        }
    }

    pub fn pop_front(&mut self) -> Option<T> {
        match self {
            PendingQueue::Ring(q) => q.pop_front(),
            PendingQueue::Deque(q) => q.pop_front(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PendingQueue::Ring(q) => q.len(),
            PendingQueue::Deque(q) => q.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every queued entry and release the backing allocation.
    pub fn release(&mut self) {
        *self = PendingQueue::new(self.strategy());
    }
}

impl<T> Default for PendingQueue<T> {
    fn default() -> Self {
        Self::new(QueueStrategy::default())
    }
}

impl<T> fmt::Debug for PendingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingQueue")
            .field("strategy", &self.strategy())
            .field("len", &self.len())
            .finish()
    }
}
