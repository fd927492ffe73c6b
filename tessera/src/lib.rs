//! # Tessera
//!
//! **Tessera** is a work-stealing async runtime built from the bottom up on
//! its own lock-free primitives.
//!
//! Layers, leaves first:
//!
//! - [`atomic`]: atomic cells with explicit memory orderings, an atomic
//!   reference count and a backoff helper,
//! - [`lockfree`]: spinlock, reader-writer lock, Treiber stack and
//!   Michael-Scott queue,
//! - [`task`]: spawning, join handles and task metadata,
//! - a reactor thread that turns descriptor readiness and timer deadlines
//!   into wake-ups ([`io`], [`time`]),
//! - the work-stealing scheduler behind [`Runtime`],
//! - [`sync`]: async mutex, semaphore, channel and wait group,
//! - [`future`], [`join!`] and [`select!`] combinators.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use tessera::task;
//! use tessera::time::sleep;
//!
//! #[tessera::main]
//! async fn main() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         "done"
//!     });
//!
//!     assert_eq!(handle.await.unwrap(), "done");
//! }
//! ```
//!
//! Tessera targets unix platforms only.

#[cfg(not(unix))]
compile_error!("tessera supports unix targets only");

mod reactor;
mod runtime;
mod utils;

pub mod atomic;
pub mod error;
pub mod future;
pub mod io;
pub mod lockfree;
pub mod sync;
pub mod time;

pub use error::{Error, Result};
pub use runtime::task;
pub use runtime::{Runtime, RuntimeBuilder, RuntimeMetrics};

pub use tessera_macros::*;
