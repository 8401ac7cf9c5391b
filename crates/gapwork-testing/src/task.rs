use std::cell::RefCell;
use std::rc::Rc;

use gapwork_core::{PrefetchTask, TaskError, TaskId, TemplateKey};

use crate::clock::ManualClock;

/// Shared record of the order in which tasks ran.
#[derive(Clone, Debug, Default)]
pub struct ExecutionLog {
    entries: Rc<RefCell<Vec<TaskId>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, id: TaskId) {
        self.entries.borrow_mut().push(id);
    }

    pub fn ids(&self) -> Vec<u64> {
        self.entries.borrow().iter().map(|id| id.0).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

#[derive(Clone, Debug)]
enum Outcome {
    Succeed,
    Fail(TaskError),
    Panic(&'static str),
}

/// A task whose cost and outcome are fixed up front.
///
/// Running it advances the shared [`ManualClock`] by its actual cost and
/// appends its id to the [`ExecutionLog`], whether it succeeds or not.
#[derive(Debug)]
pub struct ScriptedTask {
    id: TaskId,
    priority: i64,
    estimate: u64,
    actual: u64,
    forced: bool,
    cost_key: Option<TemplateKey>,
    outcome: Outcome,
    clock: Rc<ManualClock>,
    log: ExecutionLog,
}

impl ScriptedTask {
    /// A task estimated and actually costing `cost` nanoseconds.
    pub fn new(
        id: u64,
        priority: i64,
        cost: u64,
        clock: &Rc<ManualClock>,
        log: &ExecutionLog,
    ) -> Self {
        Self {
            id: TaskId(id),
            priority,
            estimate: cost,
            actual: cost,
            forced: false,
            cost_key: None,
            outcome: Outcome::Succeed,
            clock: clock.clone(),
            log: log.clone(),
        }
    }

    pub fn estimate(mut self, nanos: u64) -> Self {
        self.estimate = nanos;
        self
    }

    pub fn actual(mut self, nanos: u64) -> Self {
        self.actual = nanos;
        self
    }

    pub fn forced(mut self) -> Self {
        self.forced = true;
        self
    }

    pub fn cost_key(mut self, key: impl Into<TemplateKey>) -> Self {
        self.cost_key = Some(key.into());
        self
    }

    pub fn failing(mut self, error: TaskError) -> Self {
        self.outcome = Outcome::Fail(error);
        self
    }

    pub fn panicking(mut self, message: &'static str) -> Self {
        self.outcome = Outcome::Panic(message);
        self
    }

    pub fn boxed(self) -> Box<dyn PrefetchTask> {
        Box::new(self)
    }
}

impl PrefetchTask for ScriptedTask {
    fn id(&self) -> TaskId {
        self.id
    }

    fn estimated_cost(&self) -> u64 {
        self.estimate
    }

    fn priority(&self) -> i64 {
        self.priority
    }

    fn force_run(&self) -> bool {
        self.forced
    }

    fn cost_key(&self) -> Option<&TemplateKey> {
        self.cost_key.as_ref()
    }

    fn run(&mut self) -> Result<(), TaskError> {
        self.clock.advance(self.actual);
        self.log.record(self.id);
        match &self.outcome {
            Outcome::Succeed => Ok(()),
            Outcome::Fail(error) => Err(error.clone()),
            Outcome::Panic(message) => panic!("{message}"),
        }
    }
}
