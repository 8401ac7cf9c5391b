//! Static scheduler configuration.

use crate::error::ConfigError;

/// Refresh rate assumed when none (or an invalid one) is configured.
pub const DEFAULT_REFRESH_RATE_HZ: i32 = 60;

/// Number of off-screen items prefetched past the visible edge.
pub const DEFAULT_PREFETCH_BUFFER_COUNT: usize = 3;

/// Maximum cached artifacts per template namespace.
pub const DEFAULT_CACHE_CAPACITY: usize = 30;

/// Cost assumed for a template that has never been measured (2ms).
pub const DEFAULT_COST_ESTIMATE_NANOS: u64 = 2_000_000;

/// Below this budget a frame runs no prefetch work at all (1ms).
pub const MIN_FRAME_BUDGET_NANOS: u64 = 1_000_000;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Returns the idle-time budget for one frame at `refresh_rate_hz`.
///
/// Half of the frame interval is reserved for the host's own rendering, so
/// the budget is `1s / hz / 2`. Non-positive rates fall back to
/// [`DEFAULT_REFRESH_RATE_HZ`].
pub fn frame_budget_nanos(refresh_rate_hz: i32) -> u64 {
    frame_interval_nanos(refresh_rate_hz) / 2
}

/// Returns the length of one frame at `refresh_rate_hz`.
pub fn frame_interval_nanos(refresh_rate_hz: i32) -> u64 {
    let hz = if refresh_rate_hz > 0 {
        refresh_rate_hz
    } else {
        DEFAULT_REFRESH_RATE_HZ
    };
    NANOS_PER_SECOND / hz as u64
}

/// Scheduler configuration.
///
/// Built with [`Default`] plus the `with_*` methods. Out-of-range values are
/// not rejected; [`GapWorkerConfig::validated`] clamps them to the documented
/// defaults when a [`GapWorker`](crate::GapWorker) is constructed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GapWorkerConfig {
    /// Display refresh rate in Hz (60 and 120 are typical).
    pub refresh_rate_hz: i32,

    /// Items to prefetch beyond the visible range (`K`).
    pub prefetch_buffer_count: usize,

    /// Cached artifacts kept per template namespace.
    pub cache_capacity: usize,

    /// Cost estimate for templates without samples, in nanoseconds.
    pub default_cost_estimate_nanos: u64,
}

impl Default for GapWorkerConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: DEFAULT_REFRESH_RATE_HZ,
            prefetch_buffer_count: DEFAULT_PREFETCH_BUFFER_COUNT,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            default_cost_estimate_nanos: DEFAULT_COST_ESTIMATE_NANOS,
        }
    }
}

impl GapWorkerConfig {
    pub fn with_refresh_rate(mut self, refresh_rate_hz: i32) -> Self {
        self.refresh_rate_hz = refresh_rate_hz;
        self
    }

    pub fn with_prefetch_buffer_count(mut self, count: usize) -> Self {
        self.prefetch_buffer_count = count;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_default_cost_estimate(mut self, nanos: u64) -> Self {
        self.default_cost_estimate_nanos = nanos;
        self
    }

    /// Reports every invalid field.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        if self.refresh_rate_hz <= 0 {
            errors.push(ConfigError::InvalidRefreshRate(self.refresh_rate_hz));
        }
        if self.prefetch_buffer_count == 0 {
            errors.push(ConfigError::ZeroBufferCount);
        }
        if self.cache_capacity == 0 {
            errors.push(ConfigError::ZeroCacheCapacity);
        }
        if self.default_cost_estimate_nanos == 0 {
            errors.push(ConfigError::ZeroDefaultCost);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Returns a copy with every invalid field replaced by its default.
    pub fn validated(self) -> Self {
        let Err(errors) = self.validate() else {
            return self;
        };
        let mut config = self;
        for error in errors {
            log::warn!("gap worker config: {error}; using default");
            match error {
                ConfigError::InvalidRefreshRate(_) => {
                    config.refresh_rate_hz = DEFAULT_REFRESH_RATE_HZ;
                }
                ConfigError::ZeroBufferCount => {
                    config.prefetch_buffer_count = DEFAULT_PREFETCH_BUFFER_COUNT;
                }
                ConfigError::ZeroCacheCapacity => {
                    config.cache_capacity = DEFAULT_CACHE_CAPACITY;
                }
                ConfigError::ZeroDefaultCost => {
                    config.default_cost_estimate_nanos = DEFAULT_COST_ESTIMATE_NANOS;
                }
            }
        }
        config
    }

    /// Idle-time budget per frame for the configured refresh rate.
    pub fn frame_budget_nanos(&self) -> u64 {
        frame_budget_nanos(self.refresh_rate_hz)
    }
}
