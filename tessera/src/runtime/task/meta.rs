use super::state::TaskState;
use crate::atomic::AtomicCell;

use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::Ordering;
use std::time::Instant;

/// Process-wide id source. Starts at 1 and wraps after 2^64 spawns.
static NEXT_ID: LazyLock<AtomicCell<u64>> = LazyLock::new(|| AtomicCell::new(1));

/// Opaque identifier of a spawned task, unique for the lifetime of the
/// process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn next() -> Self {
        TaskId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduling hint attached to a task.
///
/// The scheduler records it and reports it through [`TaskInfo`] but does
/// not order queues by it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// Snapshot of a live task, as returned by
/// [`Runtime::tasks`](crate::Runtime::tasks).
#[derive(Clone, Debug)]
pub struct TaskInfo {
    pub id: TaskId,
    pub name: Option<String>,
    pub priority: Priority,
    pub deadline: Option<Instant>,
    pub state: TaskState,
}

/// Immutable per-task metadata plus the state word.
pub(crate) struct Header {
    pub(crate) id: TaskId,
    pub(crate) name: Option<String>,
    pub(crate) priority: Priority,
    pub(crate) deadline: Option<Instant>,
    pub(crate) state: AtomicCell<usize>,
}

impl Header {
    pub(crate) fn info(&self) -> TaskInfo {
        TaskInfo {
            id: self.id,
            name: self.name.clone(),
            priority: self.priority,
            deadline: self.deadline,
            state: TaskState::from_word(self.state.load(Ordering::Acquire)),
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}
