//! Idle-time prefetch scheduling for scrollable lists.
//!
//! Hosts (lists) register a [`PrefetchCollector`] with a [`GapWorker`]. Every
//! display frame the worker collects each host's [`TaskBundle`], merges them
//! by priority and runs as many tasks as fit in half of the idle frame time.
//! Results land in a one-shot [`PrefetchCache`]; measured costs refine the
//! per-template [`CostEstimator`].

pub mod collections;
pub mod config;
pub mod cost_estimator;
mod error;
pub mod frame_clock;
pub mod gap_worker;
mod key;
pub mod platform;
pub mod position_collector;
pub mod prefetch_cache;
mod stats;
pub mod task;
pub mod task_bundle;

pub use config::{
    frame_budget_nanos, frame_interval_nanos, GapWorkerConfig, DEFAULT_CACHE_CAPACITY,
    DEFAULT_COST_ESTIMATE_NANOS, DEFAULT_PREFETCH_BUFFER_COUNT, DEFAULT_REFRESH_RATE_HZ,
    MIN_FRAME_BUDGET_NANOS,
};
pub use cost_estimator::CostEstimator;
pub use error::{ConfigError, TaskError};
pub use frame_clock::{FrameClock, NoopFrameClock};
pub use gap_worker::{GapWorker, PrefetchCollector};
pub use key::{HostId, TaskId, TemplateKey};
pub use platform::MonotonicClock;
pub use position_collector::{PositionCollector, PrefetchPositionInfo, ViewportSnapshot};
pub use prefetch_cache::{CacheStats, PrefetchCache};
pub use stats::GapWorkerStats;
pub use task::{FnTask, PrefetchTask};
pub use task_bundle::{TaskBundle, PRIORITY_SENTINEL};
