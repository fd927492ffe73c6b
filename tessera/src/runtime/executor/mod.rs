//! Task executor.
//!
//! - [`core`]: shared scheduler state, spawning and re-scheduling,
//! - [`worker`]: the per-thread loop that pops, polls and steals.

pub(crate) mod core;
pub(crate) mod worker;
