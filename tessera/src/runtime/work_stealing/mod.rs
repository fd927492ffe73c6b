//! Work-stealing scheduler components.
//!
//! - [`injector`]: the global overflow queue, also where idle workers park,
//! - [`queue`]: bounded per-worker queues and the steal-half scan.

pub(crate) mod injector;
pub(crate) mod queue;
