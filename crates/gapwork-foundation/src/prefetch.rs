//! Prefetch strategy for list hosts.

use gapwork_core::{GapWorkerConfig, DEFAULT_PREFETCH_BUFFER_COUNT};

/// How many rows beyond the visible edge a list prefetches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefetchStrategy {
    /// Number of items to prefetch beyond the visible area.
    pub buffer_count: usize,

    /// Whether prefetching is enabled.
    pub enabled: bool,
}

impl Default for PrefetchStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_PREFETCH_BUFFER_COUNT)
    }
}

impl PrefetchStrategy {
    pub fn new(buffer_count: usize) -> Self {
        Self {
            buffer_count,
            enabled: true,
        }
    }

    /// Uses the worker-wide buffer count.
    pub fn from_config(config: &GapWorkerConfig) -> Self {
        Self::new(config.prefetch_buffer_count)
    }

    /// Disables prefetching.
    pub fn disabled() -> Self {
        Self {
            buffer_count: 0,
            enabled: false,
        }
    }

    /// Buffer count actually used: zero when disabled.
    pub fn effective_buffer_count(&self) -> usize {
        if self.enabled {
            self.buffer_count
        } else {
            0
        }
    }
}
