//! Reactor core and event handling.
//!
//! The reactor runs on its own thread. It owns the OS poller, a guarded
//! table of wakers waiting on descriptors, and a guarded timer queue. Futures
//! register directly through a [`ReactorHandle`]; there is no command
//! channel in between.
//!
//! Most runtime users do not interact with the reactor directly; it sits
//! behind [`crate::io`] and [`crate::time`].

mod core;
mod event;
mod timer;

pub(crate) mod future;
pub(crate) mod io;
pub(crate) mod poller;

pub(crate) use core::{Reactor, ReactorHandle};
pub(crate) use timer::TimerKey;
