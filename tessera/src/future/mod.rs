//! Combinators over lists of futures.
//!
//! - [`join_all`]: run every future concurrently, collect every output,
//! - [`select_all`]: take the first output and drop (cancel) the rest.
//!
//! The fixed-arity forms are the [`join!`](crate::join) and
//! [`select!`](crate::select) macros.

use std::future::{Future, poll_fn};
use std::pin::Pin;
use std::task::{Context, Poll};

/// A future that keeps its output once it resolves.
///
/// Lets [`join_all`] and `join!` poll several futures side by side without
/// polling a finished one again.
#[doc(hidden)]
pub enum MaybeDone<F: Future> {
    Pending(Pin<Box<F>>),
    Done(F::Output),
    Taken,
}

impl<F: Future> MaybeDone<F> {
    pub fn new(future: F) -> Self {
        MaybeDone::Pending(Box::pin(future))
    }

    /// Polls the inner future if it is still pending. Returns `true` once an
    /// output is available.
    pub fn poll_done(&mut self, cx: &mut Context<'_>) -> bool {
        if let MaybeDone::Pending(future) = self {
            match future.as_mut().poll(cx) {
                Poll::Ready(output) => *self = MaybeDone::Done(output),
                Poll::Pending => return false,
            }
        }

        true
    }

    /// Takes the output.
    ///
    /// # Panics
    ///
    /// Panics unless `poll_done` has returned `true` and the output has not
    /// been taken yet.
    pub fn take_output(&mut self) -> F::Output {
        match std::mem::replace(self, MaybeDone::Taken) {
            MaybeDone::Done(output) => output,
            _ => panic!("MaybeDone output taken before completion or twice"),
        }
    }
}

/// Runs every future concurrently and returns their outputs in input order.
///
/// # Examples
///
/// ```rust
/// use tessera::future::join_all;
///
/// #[tessera::main]
/// async fn main() {
///     let outputs = join_all((1..=3).map(|i| async move { i * 10 })).await;
///     assert_eq!(outputs, vec![10, 20, 30]);
/// }
/// ```
pub async fn join_all<I>(futures: I) -> Vec<<I::Item as Future>::Output>
where
    I: IntoIterator,
    I::Item: Future,
{
    let mut slots: Vec<MaybeDone<I::Item>> = futures.into_iter().map(MaybeDone::new).collect();

    poll_fn(|cx| {
        let mut done = true;
        for slot in slots.iter_mut() {
            done &= slot.poll_done(cx);
        }

        if done {
            Poll::Ready(slots.iter_mut().map(MaybeDone::take_output).collect())
        } else {
            Poll::Pending
        }
    })
    .await
}

/// Waits for the first future to finish.
///
/// Returns its output and its index in the input; every other future is
/// dropped before this returns.
///
/// # Panics
///
/// Panics if `futures` is empty.
///
/// # Examples
///
/// ```rust
/// use std::future::Future;
/// use std::pin::Pin;
/// use std::time::Duration;
/// use tessera::future::select_all;
/// use tessera::time::sleep;
///
/// type Racer = Pin<Box<dyn Future<Output = &'static str> + Send>>;
///
/// #[tessera::main]
/// async fn main() {
///     let racers: Vec<Racer> = vec![
///         Box::pin(async {
///             sleep(Duration::from_secs(5)).await;
///             "slow"
///         }),
///         Box::pin(async { "fast" }),
///     ];
///
///     assert_eq!(select_all(racers).await, ("fast", 1));
/// }
/// ```
pub async fn select_all<I>(futures: I) -> (<I::Item as Future>::Output, usize)
where
    I: IntoIterator,
    I::Item: Future,
{
    let mut futures: Vec<Pin<Box<I::Item>>> = futures.into_iter().map(Box::pin).collect();
    assert!(!futures.is_empty(), "select_all requires at least one future");

    poll_fn(move |cx| {
        for (index, future) in futures.iter_mut().enumerate() {
            if let Poll::Ready(output) = future.as_mut().poll(cx) {
                return Poll::Ready((output, index));
            }
        }

        Poll::Pending
    })
    .await
}
