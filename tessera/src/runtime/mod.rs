//! Core runtime components.
//!
//! This module contains the scheduler and everything a task needs while it
//! runs:
//! - the [`Runtime`] and its [`RuntimeBuilder`],
//! - the executor and its worker threads,
//! - global and per-worker run queues with work stealing,
//! - the thread-local runtime context,
//! - the registry of live tasks and the runtime counters.
//!
//! Most users will interact with [`Runtime`], [`task::spawn`] and the
//! `#[tessera::main]` attribute rather than with this module directly.

mod blocking;
mod builder;
mod core;
mod executor;
mod metrics;
mod registry;
mod work_stealing;
mod yield_now;

pub(crate) mod context;

pub mod task;

pub use builder::RuntimeBuilder;
pub use core::Runtime;
pub use metrics::RuntimeMetrics;
