use crate::reactor::ReactorHandle;
use crate::runtime::executor::core::Executor;

use std::cell::{Cell, RefCell};
use std::ptr;
use std::sync::Arc;

thread_local! {
    /// Executor of the runtime this thread is currently running for.
    ///
    /// Set on worker threads for their whole life and on a `block_on`
    /// caller for the duration of the call. Lets `spawn`, timers and I/O
    /// futures reach the runtime without passing handles around.
    static CURRENT: RefCell<Option<Arc<Executor>>> = const { RefCell::new(None) };

    /// Index of the worker owning this thread, if it is a worker.
    static CURRENT_WORKER: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Restores the previous context when dropped, so that nested `enter`
/// calls and panics unwinding out of `f` both leave the thread clean.
struct ContextGuard {
    executor: Option<Arc<Executor>>,
    worker: Option<usize>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let executor = self.executor.take();
        let installed = CURRENT.with(|current| current.replace(executor));
        CURRENT_WORKER.with(|worker| worker.set(self.worker));

        // May be the last reference; drop it with no borrow held.
        drop(installed);
    }
}

/// Runs `f` with `executor` installed as the current runtime.
///
/// `worker` is the index of the worker thread running `f`, or `None` for a
/// thread that merely drives a future with `block_on`.
pub(crate) fn enter<R>(executor: &Arc<Executor>, worker: Option<usize>, f: impl FnOnce() -> R) -> R {
    let previous = CURRENT.with(|current| current.replace(Some(executor.clone())));
    let previous_worker = CURRENT_WORKER.with(|current| current.replace(worker));

    let _guard = ContextGuard {
        executor: previous,
        worker: previous_worker,
    };

    f()
}

/// Returns the executor of the current runtime.
///
/// # Panics
///
/// Panics if called outside of a runtime.
pub(crate) fn current() -> Arc<Executor> {
    match try_current() {
        Some(executor) => executor,
        None => panic!("must be called within the context of a tessera runtime"),
    }
}

pub(crate) fn try_current() -> Option<Arc<Executor>> {
    CURRENT.with(|current| current.borrow().clone())
}

/// Returns a handle to the current runtime's reactor, if any.
pub(crate) fn try_reactor() -> Option<ReactorHandle> {
    CURRENT.with(|current| {
        current
            .borrow()
            .as_ref()
            .map(|executor| executor.reactor().clone())
    })
}

/// Returns a handle to the current runtime's reactor.
///
/// # Panics
///
/// Panics if called outside of a runtime.
pub(crate) fn reactor() -> ReactorHandle {
    match try_reactor() {
        Some(reactor) => reactor,
        None => panic!("must be called within the context of a tessera runtime"),
    }
}

/// Returns the worker index of this thread if it is one of `executor`'s
/// workers.
pub(crate) fn current_worker(executor: &Executor) -> Option<usize> {
    let worker = CURRENT_WORKER.with(Cell::get)?;

    CURRENT.with(|current| {
        let current = current.borrow();
        let owned = current
            .as_ref()
            .is_some_and(|installed| ptr::eq(Arc::as_ptr(installed), executor));

        owned.then_some(worker)
    })
}

/// Returns `true` on a worker thread of any runtime.
pub(crate) fn is_worker_thread() -> bool {
    CURRENT_WORKER.with(Cell::get).is_some()
}
