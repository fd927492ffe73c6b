use crate::reactor::poller::common::Interest;

use std::collections::HashMap;
use std::os::fd::RawFd;
use std::task::Waker;

/// A readiness direction on a descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Direction {
    Read,
    Write,
}

impl Direction {
    fn interest(self) -> Interest {
        match self {
            Direction::Read => Interest::READ,
            Direction::Write => Interest::WRITE,
        }
    }
}

/// One parked waker for one (fd, direction).
struct Registration {
    /// Identifies the future that registered, so a stale deregistration
    /// cannot remove someone else's waker.
    id: u64,
    waker: Waker,
}

#[derive(Default)]
struct IoEntry {
    read: Option<Registration>,
    write: Option<Registration>,
}

impl IoEntry {
    fn slot(&mut self, direction: Direction) -> &mut Option<Registration> {
        match direction {
            Direction::Read => &mut self.read,
            Direction::Write => &mut self.write,
        }
    }

    fn interest(&self) -> Interest {
        let mut interest = Interest::NONE;
        if self.read.is_some() {
            interest = interest | Direction::Read.interest();
        }
        if self.write.is_some() {
            interest = interest | Direction::Write.interest();
        }
        interest
    }
}

/// The reactor's waiter table: at most one waker per (fd, direction).
///
/// Every method returns the interest the descriptor should be armed with
/// afterwards, so the caller can update the poller while still holding the
/// table's lock.
#[derive(Default)]
pub(crate) struct IoTable {
    entries: HashMap<RawFd, IoEntry>,
}

impl IoTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Parks `waker` on (fd, direction). An existing registration for the
    /// same pair is overwritten and its waker dropped without being woken.
    pub(crate) fn register(
        &mut self,
        fd: RawFd,
        direction: Direction,
        id: u64,
        waker: &Waker,
    ) -> Interest {
        let entry = self.entries.entry(fd).or_default();
        let slot = entry.slot(direction);

        match slot {
            Some(registration) if registration.id == id => {
                registration.waker.clone_from(waker);
            }
            _ => {
                *slot = Some(Registration {
                    id,
                    waker: waker.clone(),
                });
            }
        }

        entry.interest()
    }

    /// Removes the registration `id` holds on (fd, direction).
    ///
    /// Returns the remaining interest, or `None` if `id` no longer owned the
    /// slot and nothing changed.
    pub(crate) fn deregister(
        &mut self,
        fd: RawFd,
        direction: Direction,
        id: u64,
    ) -> Option<Interest> {
        let entry = self.entries.get_mut(&fd)?;
        let slot = entry.slot(direction);

        if slot.as_ref().is_none_or(|r| r.id != id) {
            return None;
        }

        *slot = None;
        let remaining = entry.interest();

        if remaining.is_empty() {
            self.entries.remove(&fd);
        }

        Some(remaining)
    }

    /// Takes the wakers for the directions that became ready.
    ///
    /// Returns the interest still registered for `fd`, or `None` if the table
    /// knows nothing about it.
    pub(crate) fn ready(
        &mut self,
        fd: RawFd,
        readable: bool,
        writable: bool,
        wakers: &mut Vec<Waker>,
    ) -> Option<Interest> {
        let entry = self.entries.get_mut(&fd)?;

        if readable && let Some(registration) = entry.read.take() {
            wakers.push(registration.waker);
        }

        if writable && let Some(registration) = entry.write.take() {
            wakers.push(registration.waker);
        }

        let remaining = entry.interest();
        if remaining.is_empty() {
            self.entries.remove(&fd);
        }

        Some(remaining)
    }

    /// Number of parked wakers.
    pub(crate) fn len(&self) -> usize {
        self.entries
            .values()
            .map(|e| usize::from(e.read.is_some()) + usize::from(e.write.is_some()))
            .sum()
    }

    /// Empties the table, moving its wakers into `wakers` and returning every
    /// descriptor it referenced.
    pub(crate) fn clear(&mut self, wakers: &mut Vec<Waker>) -> Vec<RawFd> {
        self.entries
            .drain()
            .map(|(fd, entry)| {
                wakers.extend(entry.read.map(|registration| registration.waker));
                wakers.extend(entry.write.map(|registration| registration.waker));
                fd
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registrations_combine_per_descriptor() {
        let mut table = IoTable::new();
        let waker = Waker::noop();

        assert_eq!(table.register(3, Direction::Read, 1, waker), Interest::READ);
        assert_eq!(
            table.register(3, Direction::Write, 2, waker),
            Interest::READ | Interest::WRITE
        );
        assert_eq!(table.len(), 2);

        assert_eq!(table.deregister(3, Direction::Read, 1), Some(Interest::WRITE));
        assert_eq!(table.deregister(3, Direction::Write, 2), Some(Interest::NONE));
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn second_registration_overwrites_first() {
        let mut table = IoTable::new();
        let waker = Waker::noop();

        table.register(5, Direction::Read, 1, waker);
        table.register(5, Direction::Read, 2, waker);
        assert_eq!(table.len(), 1);

        // The displaced future cannot tear down the new registration.
        assert_eq!(table.deregister(5, Direction::Read, 1), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn readiness_takes_only_ready_directions() {
        let mut table = IoTable::new();
        let waker = Waker::noop();

        table.register(7, Direction::Read, 1, waker);
        table.register(7, Direction::Write, 2, waker);

        let mut wakers = Vec::new();
        let remaining = table.ready(7, true, false, &mut wakers);

        assert_eq!(wakers.len(), 1);
        assert_eq!(remaining, Some(Interest::WRITE));
        assert_eq!(table.ready(9, true, true, &mut wakers), None);
    }
}
