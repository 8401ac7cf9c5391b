use std::cell::Cell;

use gapwork_core::{FrameClock, MonotonicClock};

/// A monotonic clock that only moves when told to.
///
/// Share it (behind `Rc`) between the worker and scripted tasks so a task's
/// "run time" is whatever it advances the clock by.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(nanos: u64) -> Self {
        Self {
            now: Cell::new(nanos),
        }
    }

    pub fn now(&self) -> u64 {
        self.now.get()
    }

    pub fn advance(&self, nanos: u64) {
        self.now.set(self.now.get().saturating_add(nanos));
    }

    pub fn set(&self, nanos: u64) {
        self.now.set(nanos);
    }
}

impl MonotonicClock for ManualClock {
    fn now_nanos(&self) -> u64 {
        self.now.get()
    }
}

/// Frame clock that records how often it was started and stopped.
#[derive(Debug, Default)]
pub struct TestFrameClock {
    starts: Cell<usize>,
    stops: Cell<usize>,
    running: Cell<bool>,
}

impl TestFrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_count(&self) -> usize {
        self.starts.get()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.get()
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }
}

impl FrameClock for TestFrameClock {
    fn start(&self) {
        log::trace!("test frame clock: start #{}", self.starts.get() + 1);
        self.starts.set(self.starts.get() + 1);
        self.running.set(true);
    }

    fn stop(&self) {
        log::trace!("test frame clock: stop #{}", self.stops.get() + 1);
        self.stops.set(self.stops.get() + 1);
        self.running.set(false);
    }
}
