//! Scheduler engine -- admission, lanes, and settlement.
//!
//! Split into focused submodules:
//! - `core`: shared state, the `Scheduler` handle, and `start`
//! - `scheduling`: task submission and admission
//! - `execution`: lanes, hook dispatch, and final settlement

mod core;
mod execution;
mod scheduling;

pub use self::core::{Scheduler, start};
