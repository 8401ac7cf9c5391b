//! Per-host, priority-ordered groups of prefetch tasks.

use std::fmt;
use std::rc::Weak;

use crate::gap_worker::PrefetchCollector;
use crate::task::PrefetchTask;

/// `min_priority` of an empty bundle.
pub const PRIORITY_SENTINEL: i64 = i64::MAX;

/// The tasks one host wants run, sorted by priority on demand.
///
/// A bundle refers to its host weakly and never keeps it alive. Bundles are
/// handed to [`GapWorker::submit`](crate::GapWorker::submit), replacing the
/// host's previous bundle.
pub struct TaskBundle {
    tasks: Vec<Box<dyn PrefetchTask>>,
    min_priority: i64,
    sorted: bool,
    /// `None` for bundles not tied to a host; those are always considered alive.
    host: Option<Weak<dyn PrefetchCollector>>,
}

impl TaskBundle {
    /// Creates an empty bundle owned by `host`.
    pub fn new(host: Weak<dyn PrefetchCollector>) -> Self {
        Self {
            tasks: Vec::new(),
            min_priority: PRIORITY_SENTINEL,
            sorted: true,
            host: Some(host),
        }
    }

    /// Creates an empty bundle with no host back-reference.
    pub fn detached() -> Self {
        Self {
            tasks: Vec::new(),
            min_priority: PRIORITY_SENTINEL,
            sorted: true,
            host: None,
        }
    }

    /// Appends `task`, keeping `min_priority` current in O(1).
    pub fn add(&mut self, task: Box<dyn PrefetchTask>) {
        self.min_priority = self.min_priority.min(task.priority());
        self.tasks.push(task);
        self.sorted = false;
    }

    /// Stable ascending sort by priority; a no-op when nothing changed.
    pub fn sort(&mut self) {
        if self.sorted {
            return;
        }
        self.tasks.sort_by_key(|task| task.priority());
        self.sorted = true;
    }

    /// Removes every task and resets `min_priority` to the sentinel.
    pub fn clear(&mut self) {
        self.tasks.clear();
        self.min_priority = PRIORITY_SENTINEL;
        self.sorted = true;
    }

    /// Smallest priority in the bundle, or [`PRIORITY_SENTINEL`] when empty.
    pub fn min_priority(&self) -> i64 {
        self.min_priority
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Whether the owning host still exists.
    pub fn is_host_alive(&self) -> bool {
        self.host
            .as_ref()
            .map_or(true, |host| host.strong_count() > 0)
    }

    /// Tasks in their current order.
    pub fn tasks(&self) -> impl Iterator<Item = &dyn PrefetchTask> + '_ {
        self.tasks.iter().map(|task| task.as_ref())
    }

    pub(crate) fn task_mut(&mut self, index: usize) -> Option<&mut (dyn PrefetchTask + 'static)> {
        self.tasks.get_mut(index).map(|task| task.as_mut())
    }

    /// Removes the tasks at `indices` (any order, duplicates ignored).
    pub(crate) fn remove_indices(&mut self, indices: &mut [usize]) {
        indices.sort_unstable();
        let mut last = None;
        for &index in indices.iter().rev() {
            if last == Some(index) || index >= self.tasks.len() {
                continue;
            }
            self.tasks.remove(index);
            last = Some(index);
        }
        self.min_priority = self
            .tasks
            .iter()
            .map(|task| task.priority())
            .min()
            .unwrap_or(PRIORITY_SENTINEL);
    }
}

impl Default for TaskBundle {
    fn default() -> Self {
        Self::detached()
    }
}

impl fmt::Debug for TaskBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskBundle")
            .field("task_count", &self.tasks.len())
            .field("min_priority", &self.min_priority)
            .field("sorted", &self.sorted)
            .field("host_alive", &self.is_host_alive())
            .finish()
    }
}
