//! Periodic deadline source driving [`GapWorker::tick`](crate::GapWorker::tick).

/// A display-refresh driven clock.
///
/// The scheduler only ever starts and stops the clock; delivering the
/// per-frame deadline is the platform's job. While started, the platform calls
/// `tick(deadline)` once per refresh with at most one callback in flight.
/// Once stopped, no further callbacks are delivered.
pub trait FrameClock {
    /// Begins delivering frame callbacks.
    fn start(&self);

    /// Stops delivering frame callbacks.
    fn stop(&self);
}

/// Frame clock that never fires. Useful for hosts that drive `tick` by hand.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFrameClock;

impl FrameClock for NoopFrameClock {
    fn start(&self) {}

    fn stop(&self) {}
}
