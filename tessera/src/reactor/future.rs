use super::core::ReactorHandle;
use super::io::Direction;
use super::poller::unix::sys_poll_ready;
use crate::runtime::context;

use std::future::Future;
use std::io;
use std::os::fd::RawFd;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future returned by [`wait_readable`](crate::io::wait_readable) and
/// [`wait_writable`](crate::io::wait_writable).
///
/// Each poll first asks the OS whether the descriptor is already ready and
/// resolves at once if so. Otherwise it parks the task's waker in the
/// reactor's table and returns `Pending`. Only one waker is kept per
/// (fd, direction): a second future waiting on the same pair displaces the
/// first, which will then never be woken.
///
/// Dropping the future removes its registration.
#[must_use = "futures do nothing unless polled"]
pub struct Readiness {
    fd: RawFd,
    direction: Direction,
    registration: Option<(ReactorHandle, u64)>,
}

impl Readiness {
    pub(crate) fn new(fd: RawFd, direction: Direction) -> Self {
        Self {
            fd,
            direction,
            registration: None,
        }
    }

    fn deregister(&mut self) {
        if let Some((reactor, id)) = self.registration.take() {
            reactor.deregister_io(self.fd, self.direction, id);
        }
    }
}

impl Future for Readiness {
    type Output = io::Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        match sys_poll_ready(this.fd, this.direction) {
            Ok(true) => {
                this.deregister();
                return Poll::Ready(Ok(()));
            }
            Ok(false) => {}
            Err(err) => {
                this.deregister();
                return Poll::Ready(Err(err));
            }
        }

        if this.registration.is_none() {
            let Some(reactor) = context::try_reactor() else {
                return Poll::Ready(Err(io::Error::other(
                    "readiness polled outside of a tessera runtime",
                )));
            };

            let id = reactor.next_registration_id();
            this.registration = Some((reactor, id));
        }

        // Re-registering on every pending poll refreshes the waker and re-arms
        // a registration the reactor already consumed on a spurious wake.
        if let Some((reactor, id)) = &this.registration
            && let Err(err) = reactor.register_io(this.fd, this.direction, *id, cx.waker())
        {
            this.registration = None;
            return Poll::Ready(Err(err));
        }

        Poll::Pending
    }
}

impl Drop for Readiness {
    fn drop(&mut self) {
        self.deregister();
    }
}
