//! Asynchronous task primitives.
//!
//! A task wraps one spawned future together with its id, optional name,
//! priority tag, optional deadline and lifecycle state. Tasks are their own
//! wakers, and a [`JoinHandle`] observes the outcome.
//!
//! Most users will interact with this module through [`spawn`],
//! [`Builder`], [`JoinHandle`] and [`JoinSet`].

mod builder;
mod core;
mod handle;
mod meta;
mod set;
mod waker;

pub(crate) mod state;

pub(crate) use core::{Runnable, Task};
pub(crate) use meta::Header;

pub use crate::runtime::blocking::spawn_blocking;
pub use crate::runtime::yield_now::yield_now;
pub use builder::{Builder, spawn};
pub use handle::JoinHandle;
pub use meta::{Priority, TaskId, TaskInfo};
pub use set::JoinSet;
pub use state::TaskState;
