use super::meta::{Header, TaskInfo};
use super::state::{
    self, CANCELLED, CANCELLING, COMPLETED, NOTIFIED, READY, RUNNING, SLEEPING,
};
use crate::error::JoinError;
use crate::runtime::executor::core::Executor;

use parking_lot::Mutex;
use tracing::{error, warn};

use std::any::Any;
use std::cell::UnsafeCell;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll, Waker};
use std::time::Instant;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A runnable unit of work, with its output type erased so queues can hold
/// any task as `Arc<dyn Runnable>`.
pub(crate) trait Runnable: Send + Sync {
    /// Polls the task once, if it is still ready to run.
    fn run(self: Arc<Self>);

    /// Aborts the task; see [`Task::cancel`].
    fn cancel(&self);

    fn header(&self) -> &Header;

    fn info(&self) -> TaskInfo {
        self.header().info()
    }
}

/// A spawned future plus everything the scheduler needs to drive it.
///
/// Access to `future` is serialized by the state word: only the thread that
/// moved the task to `RUNNING` (or the canceller that moved it from
/// `SLEEPING`/`READY` to `CANCELLING`) may touch it. `output` is written once
/// before the state becomes `COMPLETED` and read only after observing
/// `COMPLETED`.
pub(crate) struct Task<T> {
    /// Identity, metadata and the state word.
    header: Header,

    /// `None` once the future finished or was dropped by an abort.
    future: UnsafeCell<Option<BoxFuture<T>>>,

    /// Taken by the `JoinHandle`.
    output: UnsafeCell<Option<Result<T, JoinError>>>,

    /// Waker of the `JoinHandle` awaiting this task.
    join_waker: Mutex<Option<Waker>>,

    /// Weak so that late wakes after shutdown are a no-op.
    executor: Weak<Executor>,
}

unsafe impl<T: Send> Send for Task<T> {}
unsafe impl<T: Send> Sync for Task<T> {}

impl<T: Send + 'static> Task<T> {
    pub(crate) fn new<F>(header: Header, future: F, executor: Weak<Executor>) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        header.state.store(READY, Ordering::Relaxed);

        Self {
            header,
            future: UnsafeCell::new(Some(Box::pin(future))),
            output: UnsafeCell::new(None),
            join_waker: Mutex::new(None),
            executor,
        }
    }

    /// Claims the task and polls its future once.
    fn poll_once(self: Arc<Self>) {
        let state = &self.header.state;

        if state
            .compare_exchange(READY, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Cancelled while queued.
            return;
        }

        let waker = Waker::from(self.clone());
        let mut cx = Context::from_waker(&waker);

        // Safety: RUNNING grants exclusive access to the future.
        let slot = unsafe { &mut *self.future.get() };
        let Some(future) = slot.as_mut() else {
            return;
        };

        match panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx))) {
            Ok(Poll::Pending) => self.suspend(),
            Ok(Poll::Ready(value)) => {
                self.drop_future();
                self.complete(Ok(value));
            }
            Err(payload) => {
                self.drop_future();

                let message = panic_message(&*payload);
                error!(
                    task.id = %self.header.id,
                    task.name = self.header.name(),
                    panic = %message,
                    "task panicked"
                );

                if let Some(executor) = self.executor.upgrade() {
                    executor.metrics().record_panic();
                }

                self.complete(Err(JoinError::Panicked(message)));
            }
        }
    }

    /// Leaves `RUNNING` after a `Pending` poll.
    fn suspend(self: Arc<Self>) {
        let state = &self.header.state;

        match state.compare_exchange(RUNNING, SLEEPING, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => {}
            Err(NOTIFIED) => {
                // Woken mid-poll: straight back into a queue, unless an
                // abort slipped in first.
                if state
                    .compare_exchange(NOTIFIED, READY, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    if let Some(executor) = self.executor.upgrade() {
                        executor.schedule(self);
                    }
                } else {
                    self.drop_future();
                    self.finish_cancelled();
                }
            }
            Err(_) => {
                // Aborted while running; the abort left the rest to us.
                self.drop_future();
                self.finish_cancelled();
            }
        }
    }

    /// Transitions the task toward the run queue in response to a wake.
    ///
    /// Duplicate wakes coalesce: only the `SLEEPING -> READY` edge enqueues,
    /// and waking a running task just marks it `NOTIFIED`.
    pub(crate) fn notify(self: &Arc<Self>) {
        let state = &self.header.state;
        let mut current = state.load(Ordering::Acquire);

        loop {
            let next = match current {
                SLEEPING => READY,
                RUNNING => NOTIFIED,
                _ => return,
            };

            match state.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    if next == READY
                        && let Some(executor) = self.executor.upgrade()
                    {
                        executor.schedule(self.clone());
                    }
                    return;
                }
                Err(actual) => current = actual,
            }
        }
    }
}

impl<T> Task<T> {
    fn complete(&self, result: Result<T, JoinError>) {
        // Bookkeeping comes before the COMPLETED store so that whoever
        // observes the completion also observes the counters.
        if let Some(executor) = self.executor.upgrade() {
            if result.is_ok() {
                executor.metrics().record_completion();
            }
            executor.registry().remove(self.header.id);
        }

        // Safety: written once, by the thread holding RUNNING.
        unsafe { *self.output.get() = Some(result) };

        // A wake or an abort may have landed during the final poll. Either
        // way the future already ran to the end, so the output stands.
        let previous = self.header.state.swap(COMPLETED, Ordering::AcqRel);
        debug_assert!(matches!(previous, RUNNING | NOTIFIED | CANCELLING));

        if let Some(deadline) = self.header.deadline
            && Instant::now() > deadline
        {
            warn!(
                task.id = %self.header.id,
                task.name = self.header.name(),
                overrun = ?Instant::now().duration_since(deadline),
                "task completed after its deadline"
            );
        }

        self.wake_join_handle();
    }

    /// Publishes `CANCELLED`. The future must already be dropped.
    fn finish_cancelled(&self) {
        if let Some(executor) = self.executor.upgrade() {
            executor.metrics().record_cancellation();
            executor.registry().remove(self.header.id);
        }

        self.header.state.store(CANCELLED, Ordering::Release);
        self.wake_join_handle();
    }

    /// Aborts the task.
    ///
    /// A task that is queued or sleeping has its future dropped right here,
    /// which also releases any waker it parked in the reactor or in a sync
    /// primitive. A task that is being polled is only marked `CANCELLING`:
    /// the worker drops its future once the poll returns, and the join handle
    /// hears nothing until then. Finished tasks and repeated aborts are left
    /// alone.
    pub(crate) fn cancel(&self) {
        let state = &self.header.state;
        let mut current = state.load(Ordering::Acquire);

        loop {
            if state::is_terminal(current) || current == CANCELLING {
                return;
            }

            match state.compare_exchange_weak(
                current,
                CANCELLING,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        if current == SLEEPING || current == READY {
            // A queued copy of the task fails its READY -> RUNNING claim.
            self.drop_future();
            self.finish_cancelled();
        }
    }

    /// Resolves once the task reached a terminal state.
    pub(crate) fn poll_join(&self, cx: &mut Context<'_>) -> Poll<Result<T, JoinError>> {
        if let Some(result) = self.try_take_output() {
            return Poll::Ready(result);
        }

        {
            let mut waker = self.join_waker.lock();
            match waker.as_mut() {
                Some(existing) => existing.clone_from(cx.waker()),
                None => *waker = Some(cx.waker().clone()),
            }
        }

        // Re-check after publishing the waker so a completion racing with the
        // registration cannot be missed.
        match self.try_take_output() {
            Some(result) => Poll::Ready(result),
            None => Poll::Pending,
        }
    }

    /// `true` once the future is gone for good; an abort still waiting on
    /// an in-flight poll does not count.
    pub(crate) fn is_finished(&self) -> bool {
        state::is_terminal(self.header.state.load(Ordering::Acquire))
    }

    pub(crate) fn id(&self) -> super::TaskId {
        self.header.id
    }

    fn try_take_output(&self) -> Option<Result<T, JoinError>> {
        match self.header.state.load(Ordering::Acquire) {
            // Safety: COMPLETED is published after `output` is written, and
            // only the single JoinHandle takes it.
            COMPLETED => match unsafe { (*self.output.get()).take() } {
                Some(result) => Some(result),
                None => panic!("JoinHandle polled after completion"),
            },
            CANCELLED => Some(Err(JoinError::Cancelled)),
            _ => None,
        }
    }

    fn wake_join_handle(&self) {
        let waker = self.join_waker.lock().take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Drops the future, containing any panic from its destructor.
    fn drop_future(&self) {
        // Safety: called only by the thread that owns the future, i.e. the
        // one that holds RUNNING or moved the task out of SLEEPING/READY.
        let future = unsafe { (*self.future.get()).take() };

        if panic::catch_unwind(AssertUnwindSafe(move || drop(future))).is_err() {
            error!(task.id = %self.header.id, "task future panicked while being dropped");
        }
    }
}

impl<T: Send + 'static> Runnable for Task<T> {
    fn run(self: Arc<Self>) {
        self.poll_once();
    }

    fn cancel(&self) {
        Task::cancel(self);
    }

    fn header(&self) -> &Header {
        &self.header
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        // A task can die without finishing when every waker to it was
        // dropped; keep the registry from listing it forever.
        if let Some(executor) = self.executor.upgrade() {
            executor.registry().remove(self.header.id);
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_owned()
    }
}
