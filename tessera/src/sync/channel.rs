use super::waiters::{self, WakerSet};
use crate::atomic::AtomicRefCount;
use crate::error::{SendError, TryRecvError};

use parking_lot::Mutex;

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Creates an unbounded multi-producer, multi-consumer channel.
///
/// Both halves can be cloned. Items sent by one sender are received in the
/// order they were sent. Once every [`Sender`] is gone and the buffer is
/// drained, [`Receiver::recv`] resolves to `None`.
///
/// # Examples
///
/// ```rust
/// use tessera::sync::channel;
/// use tessera::task;
///
/// #[tessera::main]
/// async fn main() {
///     let (tx, rx) = channel();
///
///     task::spawn(async move {
///         for i in 1..=3 {
///             tx.send(i).unwrap();
///         }
///     });
///
///     let mut received = Vec::new();
///     while let Some(value) = rx.recv().await {
///         received.push(value);
///     }
///     assert_eq!(received, vec![1, 2, 3]);
/// }
/// ```
pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            queue: VecDeque::new(),
            receivers_waiting: WakerSet::new(),
            closed: false,
        }),
        senders: AtomicRefCount::new(1),
        receivers: AtomicRefCount::new(1),
    });

    (
        Sender {
            shared: shared.clone(),
        },
        Receiver { shared },
    )
}

struct Shared<T> {
    state: Mutex<State<T>>,

    /// Live `Sender` clones; the last one to go disconnects the receivers.
    senders: AtomicRefCount,

    /// Live `Receiver` clones; the last one to go closes the channel.
    receivers: AtomicRefCount,
}

struct State<T> {
    /// Buffered items, oldest first.
    queue: VecDeque<T>,

    /// Parked `recv` futures, keyed by their slot.
    receivers_waiting: WakerSet,

    /// No more items will be accepted: every receiver is gone or one of them
    /// called `close`.
    closed: bool,
}

impl<T> Shared<T> {
    fn disconnected(&self, state: &State<T>) -> bool {
        state.queue.is_empty() && (state.closed || self.senders.count() == 0)
    }

    /// Wakes every waiting receiver.
    fn notify_receivers(&self) {
        let wakers = self.state.lock().receivers_waiting.take_all();
        waiters::wake_all(wakers);
    }
}

/// The sending half of a [`channel`].
pub struct Sender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Sender<T> {
    /// Appends `value` to the channel and wakes every waiting receiver.
    ///
    /// Fails, handing `value` back, once the channel is closed.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        let wakers = {
            let mut state = self.shared.state.lock();

            if state.closed {
                return Err(SendError(value));
            }

            state.queue.push_back(value);
            state.receivers_waiting.take_all()
        };

        waiters::wake_all(wakers);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        self.shared.senders.increment();

        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        if self.shared.senders.decrement() {
            self.shared.notify_receivers();
        }
    }
}

impl<T> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("senders", &self.shared.senders.count())
            .finish_non_exhaustive()
    }
}

/// The receiving half of a [`channel`].
///
/// Cloned receivers compete for items: each item goes to exactly one of
/// them.
pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Receiver<T> {
    /// Waits for the next item.
    ///
    /// Resolves to `None` once the channel is empty and either every sender
    /// has been dropped or the channel was closed.
    pub fn recv(&self) -> Recv<'_, T> {
        Recv {
            receiver: self,
            slot: None,
        }
    }

    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        let mut state = self.shared.state.lock();

        match state.queue.pop_front() {
            Some(value) => Ok(value),
            None if self.shared.disconnected(&state) => Err(TryRecvError::Disconnected),
            None => Err(TryRecvError::Empty),
        }
    }

    /// Stops accepting items. Items already buffered can still be received.
    pub fn close(&self) {
        let wakers = {
            let mut state = self.shared.state.lock();
            state.closed = true;
            state.receivers_waiting.take_all()
        };

        waiters::wake_all(wakers);
    }

    /// Returns `true` once no more items can arrive.
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed || self.shared.senders.count() == 0
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        self.shared.receivers.increment();

        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        if self.shared.receivers.decrement() {
            self.shared.state.lock().closed = true;
        }
    }
}

impl<T> fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("receivers", &self.shared.receivers.count())
            .finish_non_exhaustive()
    }
}

/// Future returned by [`Receiver::recv`].
#[must_use = "futures do nothing unless polled"]
pub struct Recv<'a, T> {
    receiver: &'a Receiver<T>,

    /// Our entry in `receivers_waiting`, while parked.
    slot: Option<u64>,
}

impl<T> Future for Recv<'_, T> {
    type Output = Option<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let shared = &this.receiver.shared;
        let mut state = shared.state.lock();

        if let Some(value) = state.queue.pop_front() {
            if let Some(id) = this.slot.take() {
                state.receivers_waiting.remove(id);
            }
            return Poll::Ready(Some(value));
        }

        if shared.disconnected(&state) {
            return Poll::Ready(None);
        }

        state.receivers_waiting.register(&mut this.slot, cx.waker());
        Poll::Pending
    }
}

impl<T> Drop for Recv<'_, T> {
    fn drop(&mut self) {
        if let Some(id) = self.slot.take() {
            self.receiver.shared.state.lock().receivers_waiting.remove(id);
        }
    }
}
