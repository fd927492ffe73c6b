use super::task::{Runnable, TaskId, TaskInfo};
use crate::lockfree::RwLock;

use std::collections::HashMap;
use std::mem;
use std::sync::{Arc, Weak};

/// Every live task of a runtime, by id.
///
/// Entries are weak: the registry observes tasks but never keeps one alive.
/// Tasks are upgraded only after the lock is released, because dropping the
/// last reference to a task removes it from this very registry.
pub(crate) struct TaskRegistry {
    tasks: RwLock<HashMap<TaskId, Weak<dyn Runnable>>>,
}

impl TaskRegistry {
    pub(crate) fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn insert(&self, task: &Arc<dyn Runnable>) {
        let id = task.header().id;
        self.tasks.write().insert(id, Arc::downgrade(task));
    }

    pub(crate) fn remove(&self, id: TaskId) {
        self.tasks.write().remove(&id);
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.read().len()
    }

    /// Lists live tasks ordered by id.
    pub(crate) fn snapshot(&self) -> Vec<TaskInfo> {
        let weak: Vec<_> = self.tasks.read().values().cloned().collect();

        let mut infos: Vec<TaskInfo> = weak
            .iter()
            .filter_map(Weak::upgrade)
            .map(|task| task.info())
            .collect();

        infos.sort_by_key(|info| info.id);
        infos
    }

    /// Empties the registry and returns the tasks that are still alive.
    pub(crate) fn take_all(&self) -> Vec<Arc<dyn Runnable>> {
        let tasks = mem::take(&mut *self.tasks.write());
        tasks.into_values().filter_map(|task| task.upgrade()).collect()
    }
}
