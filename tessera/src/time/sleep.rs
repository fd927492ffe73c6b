use crate::reactor::{ReactorHandle, TimerKey};
use crate::runtime::context;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Creates a future that completes after the given duration.
///
/// # Panics
///
/// The returned future panics if polled outside of a runtime.
///
/// # Examples
///
/// ```rust
/// use std::time::{Duration, Instant};
///
/// #[tessera::main]
/// async fn main() {
///     let start = Instant::now();
///     tessera::time::sleep(Duration::from_millis(10)).await;
///     assert!(start.elapsed() >= Duration::from_millis(10));
/// }
/// ```
pub fn sleep(duration: Duration) -> Sleep {
    Sleep::new(Instant::now() + duration)
}

/// Creates a future that completes once `deadline` has passed.
pub fn sleep_until(deadline: Instant) -> Sleep {
    Sleep::new(deadline)
}

/// A future that completes once a deadline is reached.
///
/// The timer is armed in the reactor on first poll and disarmed when the
/// future completes or is dropped, so an abandoned sleep never leaves a
/// registration behind.
#[must_use = "futures do nothing unless polled"]
pub struct Sleep {
    deadline: Instant,

    /// Armed on first poll; cancelled on drop or reset.
    timer: Option<(ReactorHandle, TimerKey)>,
}

impl Sleep {
    pub(crate) fn new(deadline: Instant) -> Self {
        Self {
            deadline,
            timer: None,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_elapsed(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Moves the deadline, disarming the current timer. The new timer is
    /// armed on the next poll.
    pub fn reset(&mut self, deadline: Instant) {
        self.disarm();
        self.deadline = deadline;
    }

    pub(crate) fn disarm(&mut self) {
        if let Some((reactor, key)) = self.timer.take() {
            reactor.cancel_timer(key);
        }
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if this.is_elapsed() {
            this.disarm();
            return Poll::Ready(());
        }

        // Keep the waker current: the task may have moved since the timer
        // was armed, e.g. inside `select!`.
        if let Some((reactor, key)) = &this.timer
            && reactor.update_timer(*key, cx.waker())
        {
            return Poll::Pending;
        }

        let reactor = context::reactor();
        let key = reactor.register_timer(this.deadline, cx.waker());
        this.timer = Some((reactor, key));

        Poll::Pending
    }
}

impl fmt::Debug for Sleep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sleep")
            .field("deadline", &self.deadline)
            .field("armed", &self.timer.is_some())
            .finish()
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        self.disarm();
    }
}
