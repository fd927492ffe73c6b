//! Task lifecycle encoding.
//!
//! The state word moves through:
//!
//! ```text
//!            wake              pop & claim
//! SLEEPING -------> READY -----------------> RUNNING
//!    ^                                     |  |  |
//!    |            Pending, no wake         |  |  | wake while running
//!    +-------------------------------------+  |  v
//!                                             | NOTIFIED --(Pending)--> READY
//!                              Ready / panic  v
//!                                         COMPLETED
//! ```
//!
//! `abort` moves any non-terminal state to `CANCELLING`. Whoever owns the
//! future at that moment drops it and then publishes `CANCELLED`: the
//! canceller itself for a sleeping or queued task, the worker once its poll
//! returns for a running one. A poll that returns `Ready` while `CANCELLING`
//! still ends in `COMPLETED`, since its side effects already happened.
//!
//! `COMPLETED` and `CANCELLED` are terminal, and both are published only
//! after the future has been dropped.

use std::fmt;

/// Waiting for a wake; not in any queue.
pub(crate) const SLEEPING: usize = 0;

/// In exactly one run queue, waiting to be polled.
pub(crate) const READY: usize = 1;

/// Being polled by a worker. At most one worker observes this at a time.
pub(crate) const RUNNING: usize = 2;

/// The future returned `Ready` (or panicked) and will never be polled again.
pub(crate) const COMPLETED: usize = 3;

/// Woken while running; goes back to a queue as soon as the poll returns.
pub(crate) const NOTIFIED: usize = 4;

/// Aborted before completion; the future is gone.
pub(crate) const CANCELLED: usize = 5;

/// Abort requested; the future has not been dropped yet.
pub(crate) const CANCELLING: usize = 6;

pub(crate) fn is_terminal(state: usize) -> bool {
    state == COMPLETED || state == CANCELLED
}

/// Public view of a task's lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Queued, waiting for a worker.
    Ready,

    /// Being polled right now.
    Running,

    /// Suspended until something wakes it.
    Sleeping,

    /// Finished.
    Completed,

    /// Aborted, but the future is still being torn down.
    Cancelling,

    /// Aborted before finishing.
    Cancelled,
}

impl TaskState {
    pub(crate) fn from_word(state: usize) -> Self {
        match state {
            SLEEPING => TaskState::Sleeping,
            READY => TaskState::Ready,
            RUNNING | NOTIFIED => TaskState::Running,
            COMPLETED => TaskState::Completed,
            CANCELLING => TaskState::Cancelling,
            _ => TaskState::Cancelled,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Ready => "ready",
            TaskState::Running => "running",
            TaskState::Sleeping => "sleeping",
            TaskState::Completed => "completed",
            TaskState::Cancelling => "cancelling",
            TaskState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}
