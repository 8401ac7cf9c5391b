use thiserror::Error;

/// Failure reported by a prefetch task.
///
/// Task failures never escape [`GapWorker::tick`](crate::GapWorker::tick);
/// the scheduler logs them and moves on to the next task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("template `{template}` failed to parse: {reason}")]
    Parse { template: String, reason: String },
    #[error("binding data for item {position} failed: {reason}")]
    Bind { position: usize, reason: String },
    #[error("layout of item {position} failed: {reason}")]
    Layout { position: usize, reason: String },
    #[error("no data for item {position}")]
    MissingData { position: usize },
    #[error("task panicked: {0}")]
    Panicked(String),
    #[error("{0}")]
    Other(String),
}

/// Invalid scheduler configuration.
///
/// Construction never fails on these; [`GapWorkerConfig::validated`]
/// clamps the offending value and logs the error instead.
///
/// [`GapWorkerConfig::validated`]: crate::GapWorkerConfig::validated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("refresh rate must be positive, got {0} Hz")]
    InvalidRefreshRate(i32),
    #[error("prefetch buffer count must be positive")]
    ZeroBufferCount,
    #[error("cache capacity must be positive")]
    ZeroCacheCapacity,
    #[error("default cost estimate must be positive")]
    ZeroDefaultCost,
}
