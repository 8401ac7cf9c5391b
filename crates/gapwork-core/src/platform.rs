//! Platform abstraction traits for the prefetch scheduler.
//!
//! These traits let the scheduler delegate frame pacing and time measurement
//! to the host platform, so the same scheduling core runs against a display
//! link in production and a hand-driven clock in tests.

/// Monotonic time source used to measure task cost and remaining frame time.
///
/// All values are nanoseconds on a single timeline shared with the frame
/// deadlines handed to [`GapWorker::tick`](crate::GapWorker::tick).
pub trait MonotonicClock {
    /// Returns the current time in nanoseconds.
    fn now_nanos(&self) -> u64;
}

