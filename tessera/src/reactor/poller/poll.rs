//! Portable `poll(2)` backend for unix targets without `epoll`.
//!
//! The interest set lives in a map and is turned into a `pollfd` array on
//! every turn. A non-blocking self-pipe interrupts a blocking wait.

use super::common::{Interest, timeout_millis};
use super::unix::sys_set_nonblocking;
use crate::reactor::event::Event;

use libc::{POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT, pollfd};
use parking_lot::Mutex;

use std::collections::HashMap;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

pub(crate) struct PollPoller {
    interests: Mutex<HashMap<RawFd, Interest>>,
    reader: OwnedFd,
    writer: OwnedFd,
    capacity: usize,
}

impl PollPoller {
    pub(crate) fn new(capacity: usize) -> io::Result<Self> {
        let mut fds = [0 as libc::c_int; 2];
        if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
            return Err(io::Error::last_os_error());
        }

        let reader = unsafe { OwnedFd::from_raw_fd(fds[0]) };
        let writer = unsafe { OwnedFd::from_raw_fd(fds[1]) };

        for fd in [&reader, &writer] {
            sys_set_nonblocking(fd.as_raw_fd())?;
            if unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) } < 0 {
                return Err(io::Error::last_os_error());
            }
        }

        Ok(Self {
            interests: Mutex::new(HashMap::new()),
            reader,
            writer,
            capacity,
        })
    }

    pub(crate) fn notify(&self) -> io::Result<()> {
        let byte = 1u8;
        let rc = unsafe { libc::write(self.writer.as_raw_fd(), &byte as *const u8 as *const _, 1) };

        // A full pipe already guarantees a wake-up.
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::WouldBlock {
                return Err(err);
            }
        }

        Ok(())
    }

    pub(crate) fn register(&self, fd: RawFd, interest: Interest) -> io::Result<()> {
        {
            let mut interests = self.interests.lock();
            if interest.is_empty() {
                interests.remove(&fd);
            } else {
                interests.insert(fd, interest);
            }
        }

        // The waiting thread has to rebuild its pollfd array.
        self.notify()
    }

    pub(crate) fn deregister(&self, fd: RawFd) -> io::Result<()> {
        self.register(fd, Interest::NONE)
    }

    pub(crate) fn poll(&self, out: &mut Vec<Event>, timeout: Option<Duration>) -> io::Result<()> {
        let mut fds = Vec::with_capacity(self.capacity + 1);
        fds.push(pollfd {
            fd: self.reader.as_raw_fd(),
            events: POLLIN,
            revents: 0,
        });

        for (&fd, interest) in self.interests.lock().iter() {
            let mut events = 0;
            if interest.read {
                events |= POLLIN;
            }
            if interest.write {
                events |= POLLOUT;
            }

            fds.push(pollfd {
                fd,
                events,
                revents: 0,
            });
        }

        let n = unsafe {
            libc::poll(
                fds.as_mut_ptr(),
                fds.len() as libc::nfds_t,
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

        if fds[0].revents & POLLIN != 0 {
            let mut buf = [0u8; 64];
            loop {
                let n = unsafe {
                    libc::read(self.reader.as_raw_fd(), buf.as_mut_ptr() as *mut _, buf.len())
                };
                if n <= 0 {
                    break;
                }
            }
        }

        for entry in fds[1..].iter().filter(|p| p.revents != 0) {
            let failed = entry.revents & (POLLERR | POLLHUP | POLLNVAL) != 0;

            out.push(Event {
                fd: entry.fd,
                readable: failed || entry.revents & POLLIN != 0,
                writable: failed || entry.revents & POLLOUT != 0,
            });

            if out.len() >= self.capacity {
                break;
            }
        }

        Ok(())
    }
}
