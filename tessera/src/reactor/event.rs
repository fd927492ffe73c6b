use std::os::fd::RawFd;

/// Readiness reported by the poller for one descriptor.
///
/// Error and hang-up conditions are reported as both readable and writable,
/// so whoever is waiting wakes up and discovers the error on its next
/// syscall.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Event {
    pub(crate) fd: RawFd,
    pub(crate) readable: bool,
    pub(crate) writable: bool,
}
