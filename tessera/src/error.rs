//! Error types returned by the runtime and its primitives.
//!
//! I/O failures are plain [`std::io::Error`] values. Everything else gets a
//! small dedicated type so callers can match on exactly what went wrong, and
//! [`Error`] folds them together for code that just wants `?` to work.

use std::fmt;
use std::io;

/// Why awaiting a [`JoinHandle`](crate::task::JoinHandle) produced no value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    /// The task was aborted, or the runtime shut down before it finished.
    #[error("task was cancelled")]
    Cancelled,

    /// The task panicked while being polled.
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl JoinError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JoinError::Cancelled)
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, JoinError::Panicked(_))
    }
}

/// The deadline of a [`timeout`](crate::time::timeout) passed before the
/// inner future completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline has elapsed")]
pub struct Elapsed;

/// A value could not be sent because the channel is closed.
///
/// The value is handed back so nothing is lost.
#[derive(PartialEq, Eq, thiserror::Error)]
#[error("sending on a closed channel")]
pub struct SendError<T>(pub T);

impl<T> SendError<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendError").finish_non_exhaustive()
    }
}

/// Returned by [`Receiver::try_recv`](crate::sync::Receiver::try_recv).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TryRecvError {
    /// Nothing is queued right now, but more may arrive.
    #[error("channel is empty")]
    Empty,

    /// Nothing is queued and no sender can add more.
    #[error("channel is empty and closed")]
    Disconnected,
}

/// Returned by [`Mutex::try_lock`](crate::sync::Mutex::try_lock).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("mutex is already locked")]
pub struct TryLockError;

/// Returned by [`Semaphore::try_acquire`](crate::sync::Semaphore::try_acquire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TryAcquireError {
    #[error("no permits available")]
    NoPermits,

    #[error("semaphore is closed")]
    Closed,
}

/// Returned by [`Semaphore::acquire`](crate::sync::Semaphore::acquire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AcquireError {
    #[error("semaphore is closed")]
    Closed,
}

/// Crate-level error aggregating every failure an application is likely to
/// propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Elapsed(#[from] Elapsed),

    #[error(transparent)]
    Join(#[from] JoinError),

    #[error(transparent)]
    Acquire(#[from] AcquireError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_error_hands_value_back() {
        let err = SendError(vec![1, 2, 3]);
        assert_eq!(err.to_string(), "sending on a closed channel");
        assert_eq!(err.into_inner(), vec![1, 2, 3]);
    }

    #[test]
    fn aggregate_converts_with_question_mark() {
        fn fails() -> Result<()> {
            Err::<(), _>(Elapsed)?;
            Ok(())
        }

        assert!(matches!(fails(), Err(Error::Elapsed(Elapsed))));

        let io: Error = io::Error::other("boom").into();
        assert_eq!(io.to_string(), "boom");
    }
}
