//! OS readiness polling.
//!
//! The backend is picked at compile time: `epoll` on Linux and Android,
//! `poll(2)` everywhere else on unix. Both expose the same inherent methods
//! (`new`, `notify`, `register`, `deregister`, `poll`), and the reactor only
//! names the [`Poller`] alias.

pub(crate) mod common;
pub(crate) mod unix;

#[cfg(any(target_os = "linux", target_os = "android"))]
mod epoll;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
mod poll;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub(crate) type Poller = epoll::EpollPoller;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub(crate) type Poller = poll::PollPoller;
