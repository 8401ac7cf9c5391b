//! Testing utilities for the gapwork prefetch scheduler.
//!
//! Provides hand-driven clocks, a frame clock that records start/stop
//! calls, scripted tasks with configurable cost and failure, and closure
//! collectors.

pub mod clock;
pub mod collector;
pub mod task;

pub use clock::{ManualClock, TestFrameClock};
pub use collector::CollectorFn;
pub use task::{ExecutionLog, ScriptedTask};

pub mod prelude {
    pub use crate::clock::*;
    pub use crate::collector::*;
    pub use crate::task::*;
}
