use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Returns `Pending` once after waking itself, then `Ready`.
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.yielded {
            return Poll::Ready(());
        }

        self.yielded = true;

        // The task is RUNNING, so this only marks it NOTIFIED and it is
        // re-queued at the back of this worker's local queue.
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Yields execution back to the scheduler.
///
/// Other queued tasks get a chance to run before the current task
/// continues. There are no implicit preemption points, so long-running
/// loops should call this now and then.
///
/// # Examples
///
/// ```rust
/// use tessera::task;
///
/// #[tessera::main]
/// async fn main() {
///     for _ in 0..3 {
///         task::yield_now().await;
///     }
/// }
/// ```
pub async fn yield_now() {
    YieldNow { yielded: false }.await
}
