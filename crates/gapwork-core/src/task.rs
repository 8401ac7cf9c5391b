//! Units of prefetch work.

use std::fmt;

use crate::error::TaskError;
use crate::key::{TaskId, TemplateKey};

/// A cooperative, non-preemptible unit of prefetch work.
///
/// Once [`run`](PrefetchTask::run) starts it runs to completion; the only
/// cancellation is removing the task from its bundle before the scheduler
/// reaches it. The other accessors must be cheap and must not change while
/// the task sits in a bundle.
pub trait PrefetchTask {
    fn id(&self) -> TaskId;

    /// Expected run time in nanoseconds.
    fn estimated_cost(&self) -> u64;

    /// Smaller runs first.
    fn priority(&self) -> i64;

    /// Forced tasks run whenever they are reached, regardless of budget.
    fn force_run(&self) -> bool {
        false
    }

    /// Key under which the measured cost is recorded, if any.
    fn cost_key(&self) -> Option<&TemplateKey> {
        None
    }

    /// Does the work, typically storing its artifact in a prefetch cache.
    fn run(&mut self) -> Result<(), TaskError>;
}

/// A [`PrefetchTask`] backed by a closure.
pub struct FnTask<F> {
    id: TaskId,
    priority: i64,
    estimated_cost: u64,
    force_run: bool,
    cost_key: Option<TemplateKey>,
    work: F,
}

impl<F> FnTask<F>
where
    F: FnMut() -> Result<(), TaskError>,
{
    pub fn new(id: impl Into<TaskId>, priority: i64, estimated_cost: u64, work: F) -> Self {
        Self {
            id: id.into(),
            priority,
            estimated_cost,
            force_run: false,
            cost_key: None,
            work,
        }
    }

    pub fn forced(mut self) -> Self {
        self.force_run = true;
        self
    }

    pub fn with_cost_key(mut self, key: TemplateKey) -> Self {
        self.cost_key = Some(key);
        self
    }
}

impl<F> PrefetchTask for FnTask<F>
where
    F: FnMut() -> Result<(), TaskError>,
{
    fn id(&self) -> TaskId {
        self.id
    }

    fn estimated_cost(&self) -> u64 {
        self.estimated_cost
    }

    fn priority(&self) -> i64 {
        self.priority
    }

    fn force_run(&self) -> bool {
        self.force_run
    }

    fn cost_key(&self) -> Option<&TemplateKey> {
        self.cost_key.as_ref()
    }

    fn run(&mut self) -> Result<(), TaskError> {
        (self.work)()
    }
}

impl<F> fmt::Debug for FnTask<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTask")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("estimated_cost", &self.estimated_cost)
            .field("force_run", &self.force_run)
            .finish()
    }
}
