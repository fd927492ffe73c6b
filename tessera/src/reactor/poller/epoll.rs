//! Linux `epoll` backend.
//!
//! Descriptors are registered level-triggered with the descriptor itself as
//! the token. An `eventfd` registered under [`WAKE_TOKEN`] lets other threads
//! interrupt a blocking `epoll_wait`.

use super::common::{Interest, timeout_millis};
use crate::reactor::event::Event;

use libc::{
    EFD_CLOEXEC, EFD_NONBLOCK, EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD,
    EPOLLERR, EPOLLHUP, EPOLLIN, EPOLLOUT, epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use parking_lot::Mutex;

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::ptr;
use std::time::Duration;

/// Reserved token for the wake-up `eventfd`; descriptors are never negative,
/// so no registered fd can collide with it.
const WAKE_TOKEN: u64 = u64::MAX;

pub(crate) struct EpollPoller {
    epoll: OwnedFd,
    eventfd: OwnedFd,

    /// Reusable buffer for `epoll_wait`, only touched by the reactor thread.
    events: Mutex<Vec<epoll_event>>,
}

impl EpollPoller {
    pub(crate) fn new(capacity: usize) -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }
        let epoll = unsafe { OwnedFd::from_raw_fd(epoll) };

        let eventfd = unsafe { libc::eventfd(0, EFD_NONBLOCK | EFD_CLOEXEC) };
        if eventfd < 0 {
            return Err(io::Error::last_os_error());
        }
        let eventfd = unsafe { OwnedFd::from_raw_fd(eventfd) };

        let mut event = epoll_event {
            events: EPOLLIN as u32,
            u64: WAKE_TOKEN,
        };

        let rc = unsafe {
            epoll_ctl(
                epoll.as_raw_fd(),
                EPOLL_CTL_ADD,
                eventfd.as_raw_fd(),
                &mut event,
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            epoll,
            eventfd,
            events: Mutex::new(Vec::with_capacity(capacity)),
        })
    }

    /// Interrupts a blocking [`poll`](Self::poll).
    pub(crate) fn notify(&self) -> io::Result<()> {
        let buf: u64 = 1;
        let rc = unsafe {
            libc::write(
                self.eventfd.as_raw_fd(),
                &buf as *const u64 as *const _,
                8,
            )
        };

        // A saturated counter already guarantees a wake-up.
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::WouldBlock {
                return Err(err);
            }
        }

        Ok(())
    }

    /// Sets the interest for `fd`, adding it to the epoll set if needed.
    /// An empty interest removes it.
    pub(crate) fn register(&self, fd: RawFd, interest: Interest) -> io::Result<()> {
        if interest.is_empty() {
            return self.deregister(fd);
        }

        let mut flags = 0;
        if interest.read {
            flags |= EPOLLIN;
        }
        if interest.write {
            flags |= EPOLLOUT;
        }

        let mut event = epoll_event {
            events: flags as u32,
            u64: fd as u64,
        };

        let rc = unsafe { epoll_ctl(self.epoll.as_raw_fd(), EPOLL_CTL_MOD, fd, &mut event) };
        if rc == 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ENOENT) {
            return Err(err);
        }

        let rc = unsafe { epoll_ctl(self.epoll.as_raw_fd(), EPOLL_CTL_ADD, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    pub(crate) fn deregister(&self, fd: RawFd) -> io::Result<()> {
        let rc = unsafe {
            epoll_ctl(
                self.epoll.as_raw_fd(),
                EPOLL_CTL_DEL,
                fd,
                ptr::null_mut(),
            )
        };

        if rc < 0 {
            let err = io::Error::last_os_error();

            // Closing a descriptor removes it from the set on its own.
            match err.raw_os_error() {
                Some(libc::ENOENT) | Some(libc::EBADF) => return Ok(()),
                _ => return Err(err),
            }
        }

        Ok(())
    }

    /// Waits for readiness and appends one [`Event`] per ready descriptor.
    pub(crate) fn poll(&self, out: &mut Vec<Event>, timeout: Option<Duration>) -> io::Result<()> {
        let mut events = self.events.lock();
        let capacity = events.capacity();

        let n = unsafe {
            epoll_wait(
                self.epoll.as_raw_fd(),
                events.as_mut_ptr(),
                capacity as libc::c_int,
                timeout_millis(timeout),
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        // Safety: `epoll_wait` initialized the first `n` entries.
        unsafe { events.set_len(n as usize) };

        for ev in events.iter() {
            let token = ev.u64;

            if token == WAKE_TOKEN {
                let mut buf = 0u64;
                unsafe {
                    libc::read(
                        self.eventfd.as_raw_fd(),
                        &mut buf as *mut u64 as *mut _,
                        8,
                    );
                }
                continue;
            }

            let failed = ev.events & ((EPOLLERR | EPOLLHUP) as u32) != 0;

            out.push(Event {
                fd: token as RawFd,
                readable: failed || ev.events & (EPOLLIN as u32) != 0,
                writable: failed || ev.events & (EPOLLOUT as u32) != 0,
            });
        }

        events.clear();
        Ok(())
    }
}
