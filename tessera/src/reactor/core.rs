use super::event::Event;
use super::io::{Direction, IoTable};
use super::poller::Poller;
use super::timer::{TimerKey, TimerQueue};
use crate::atomic::AtomicCell;

use parking_lot::Mutex;
use tracing::{debug, error, trace};

use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::task::Waker;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// State shared between the reactor thread and every handle.
struct Shared {
    poller: Poller,

    /// Guarded waiter table for descriptors. The poller is re-armed while
    /// this lock is held so table and kernel state never disagree.
    io: Mutex<IoTable>,

    /// Pending sleeps and timeouts.
    timers: Mutex<TimerQueue>,

    /// Set once; the reactor thread exits on its next turn.
    shutdown: AtomicCell<bool>,

    /// Source of registration ids for readiness futures.
    next_registration: AtomicCell<u64>,
}

/// The reactor: a dedicated thread translating OS readiness and elapsed
/// deadlines into [`Waker`] calls.
///
/// Wakers are always invoked after the table locks are released, so a woken
/// task can re-register immediately without deadlocking.
pub(crate) struct Reactor {
    handle: ReactorHandle,
    thread: Option<JoinHandle<()>>,
}

/// Cheap, cloneable access to a running reactor.
#[derive(Clone)]
pub(crate) struct ReactorHandle {
    shared: Arc<Shared>,
}

impl Reactor {
    /// Creates the OS poller and starts the reactor thread.
    pub(crate) fn start(event_capacity: usize) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            poller: Poller::new(event_capacity)?,
            io: Mutex::new(IoTable::new()),
            timers: Mutex::new(TimerQueue::new()),
            shutdown: AtomicCell::new(false),
            next_registration: AtomicCell::new(1),
        });

        let thread = thread::Builder::new()
            .name("tessera-reactor".into())
            .spawn({
                let shared = shared.clone();
                move || run(&shared, event_capacity)
            })?;

        debug!(event_capacity, "reactor started");

        Ok(Self {
            handle: ReactorHandle { shared },
            thread: Some(thread),
        })
    }

    pub(crate) fn handle(&self) -> &ReactorHandle {
        &self.handle
    }

    /// Stops the reactor thread and drops every waker it still holds.
    ///
    /// Safe to call more than once.
    pub(crate) fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        let shared = &self.handle.shared;
        shared.shutdown.store(true, Ordering::Release);

        if let Err(err) = shared.poller.notify() {
            error!(error = %err, "failed to interrupt reactor for shutdown");
        }

        if thread.join().is_err() {
            error!("reactor thread panicked");
        }

        // Wakers may be the last reference to a task; drop them with no
        // table lock held.
        let mut wakers = Vec::new();

        for fd in shared.io.lock().clear(&mut wakers) {
            let _ = shared.poller.deregister(fd);
        }
        wakers.extend(shared.timers.lock().clear());

        drop(wakers);

        debug!("reactor stopped");
    }
}

impl Drop for Reactor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl ReactorHandle {
    /// Allocates an id for a new readiness registration.
    pub(crate) fn next_registration_id(&self) -> u64 {
        self.shared.next_registration.fetch_add(1, Ordering::Relaxed)
    }

    /// Parks `waker` until `fd` becomes ready in `direction`, replacing any
    /// waker already parked there.
    pub(crate) fn register_io(
        &self,
        fd: RawFd,
        direction: Direction,
        id: u64,
        waker: &Waker,
    ) -> io::Result<()> {
        let mut table = self.shared.io.lock();
        let interest = table.register(fd, direction, id, waker);

        if let Err(err) = self.shared.poller.register(fd, interest) {
            table.deregister(fd, direction, id);
            return Err(err);
        }

        Ok(())
    }

    /// Removes the registration `id` holds on (fd, direction), if it still
    /// holds one.
    pub(crate) fn deregister_io(&self, fd: RawFd, direction: Direction, id: u64) {
        let mut table = self.shared.io.lock();

        if let Some(remaining) = table.deregister(fd, direction, id)
            && let Err(err) = self.shared.poller.register(fd, remaining)
        {
            trace!(fd, error = %err, "failed to re-arm descriptor");
        }
    }

    /// Arms a timer that wakes `waker` once `deadline` has passed.
    pub(crate) fn register_timer(&self, deadline: Instant, waker: &Waker) -> TimerKey {
        let (key, earliest) = self.shared.timers.lock().insert(deadline, waker);

        if earliest && let Err(err) = self.shared.poller.notify() {
            error!(error = %err, "failed to interrupt reactor for new timer");
        }

        key
    }

    /// Replaces the waker of a pending timer. `false` means the timer has
    /// already fired.
    pub(crate) fn update_timer(&self, key: TimerKey, waker: &Waker) -> bool {
        self.shared.timers.lock().set_waker(key, waker)
    }

    pub(crate) fn cancel_timer(&self, key: TimerKey) -> bool {
        // Dropped after the lock is released.
        let waker = self.shared.timers.lock().cancel(key);
        waker.is_some()
    }

    pub(crate) fn pending_timers(&self) -> usize {
        self.shared.timers.lock().len()
    }

    pub(crate) fn io_registrations(&self) -> usize {
        self.shared.io.lock().len()
    }
}

/// Reactor thread body.
fn run(shared: &Shared, event_capacity: usize) {
    let mut events: Vec<Event> = Vec::with_capacity(event_capacity);
    let mut wakers: Vec<Waker> = Vec::new();

    while !shared.shutdown.load(Ordering::Acquire) {
        let timeout = shared
            .timers
            .lock()
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()));

        if let Err(err) = shared.poller.poll(&mut events, timeout) {
            error!(error = %err, "reactor poll failed, stopping");
            break;
        }

        if !events.is_empty() {
            let mut table = shared.io.lock();

            for event in events.drain(..) {
                let Some(remaining) =
                    table.ready(event.fd, event.readable, event.writable, &mut wakers)
                else {
                    // Nobody waits on it anymore.
                    let _ = shared.poller.deregister(event.fd);
                    continue;
                };

                if let Err(err) = shared.poller.register(event.fd, remaining) {
                    trace!(fd = event.fd, error = %err, "failed to re-arm descriptor");
                }
            }
        }

        let fired = shared.timers.lock().expire(Instant::now(), &mut wakers);
        if fired > 0 {
            trace!(fired, "timers expired");
        }

        for waker in wakers.drain(..) {
            waker.wake();
        }
    }
}
