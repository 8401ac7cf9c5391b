//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides concrete implementations of the clock traits defined
//! in `gapwork-core`: a monotonic [`StdClock`] and a vsync-paced
//! [`StdFrameClock`] that drives a [`GapWorker`](gapwork_core::GapWorker)
//! from a plain frame loop.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use gapwork_core::{frame_interval_nanos, FrameClock, MonotonicClock};
use web_time::Instant;

/// Monotonic clock backed by [`web_time::Instant`].
///
/// Readings are nanoseconds since the clock was created. Copies share the
/// same origin.
#[derive(Clone, Copy, Debug)]
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Returns the elapsed time since `since_nanos` as a [`Duration`].
    pub fn elapsed(&self, since_nanos: u64) -> Duration {
        Duration::from_nanos(self.now_nanos().saturating_sub(since_nanos))
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for StdClock {
    fn now_nanos(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

type StartWaker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Frame clock that paces a loop to a fixed refresh rate.
///
/// [`FrameClock::start`] arms the clock and invokes the start waker, so an
/// event loop parked elsewhere can resume; [`await_frame`] then sleeps until
/// the next vsync boundary and reports the deadline of that frame.
/// [`FrameClock::stop`] disarms it and the loop winds down.
///
/// [`await_frame`]: StdFrameClock::await_frame
pub struct StdFrameClock {
    clock: StdClock,
    running: AtomicBool,
    interval_nanos: AtomicU64,
    next_vsync: Mutex<u64>,
    start_waker: RwLock<Option<StartWaker>>,
}

impl StdFrameClock {
    pub fn new(refresh_rate_hz: i32) -> Self {
        Self::with_clock(refresh_rate_hz, StdClock::new())
    }

    /// Uses `clock` as the time base, so deadlines match what a worker built
    /// with the same clock measures.
    pub fn with_clock(refresh_rate_hz: i32, clock: StdClock) -> Self {
        Self {
            clock,
            running: AtomicBool::new(false),
            interval_nanos: AtomicU64::new(frame_interval_nanos(refresh_rate_hz)),
            next_vsync: Mutex::new(0),
            start_waker: RwLock::new(None),
        }
    }

    pub fn clock(&self) -> StdClock {
        self.clock
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn frame_interval_nanos(&self) -> u64 {
        self.interval_nanos.load(Ordering::SeqCst)
    }

    pub fn set_refresh_rate(&self, refresh_rate_hz: i32) {
        self.interval_nanos
            .store(frame_interval_nanos(refresh_rate_hz), Ordering::SeqCst);
    }

    /// Registers a waker that will be invoked whenever the clock is started.
    pub fn set_start_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self
            .start_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    /// Clears any registered start waker.
    pub fn clear_start_waker(&self) {
        *self
            .start_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Sleeps until the next vsync and returns that frame's deadline.
    ///
    /// Returns `None` without sleeping when the clock is stopped.
    pub fn await_frame(&self) -> Option<u64> {
        if !self.is_running() {
            return None;
        }
        let interval = self.frame_interval_nanos();
        let now = self.clock.now_nanos();
        let vsync = {
            let mut next = self
                .next_vsync
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if *next <= now {
                // Snap to the interval grid; missed vsyncs are skipped.
                *next = (now / interval + 1) * interval;
            }
            let vsync = *next;
            *next = vsync + interval;
            vsync
        };
        std::thread::sleep(Duration::from_nanos(vsync.saturating_sub(now)));
        Some(vsync + interval)
    }

    /// Runs `on_frame` with each frame deadline until the clock stops or
    /// `on_frame` returns `false`. Returns the number of frames delivered.
    pub fn run_frames(&self, mut on_frame: impl FnMut(u64) -> bool) -> u64 {
        let mut frames = 0;
        while let Some(deadline) = self.await_frame() {
            frames += 1;
            if !on_frame(deadline) {
                break;
            }
        }
        log::debug!("frame loop ended after {frames} frames");
        frames
    }

    fn wake(&self) {
        let waker = self
            .start_waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdFrameClock {
    fn default() -> Self {
        Self::new(gapwork_core::DEFAULT_REFRESH_RATE_HZ)
    }
}

impl fmt::Debug for StdFrameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdFrameClock")
            .field("running", &self.is_running())
            .field("interval_nanos", &self.frame_interval_nanos())
            .finish()
    }
}

impl FrameClock for StdFrameClock {
    fn start(&self) {
        if !self.running.swap(true, Ordering::SeqCst) {
            log::trace!("frame clock started");
            self.wake();
        }
    }

    fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            log::trace!("frame clock stopped");
        }
    }
}

#[cfg(test)]
#[path = "tests/std_runtime_tests.rs"]
mod tests;
