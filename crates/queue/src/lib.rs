//! FIFO storage for tasks waiting on a free concurrency slot.

pub mod error;
pub mod pending;
pub mod ring;

pub use error::QueueError;
pub use pending::{PendingQueue, QueueStrategy};
pub use ring::RingQueue;
