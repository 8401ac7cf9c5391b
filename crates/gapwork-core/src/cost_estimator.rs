//! Per-template execution cost tracking.
//!
//! Costs are kept as an exponentially weighted moving average with a fixed
//! weight of 1/4 on each new sample. The arithmetic is done in integer
//! nanoseconds so thousands of frames of updates never accumulate float drift.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::collections::map::HashMap;
use crate::config::DEFAULT_COST_ESTIMATE_NANOS;
use crate::key::TemplateKey;

#[derive(Clone, Copy, Debug, Default)]
struct CostSample {
    average: u64,
    samples: u64,
}

/// Moving-average cost estimator keyed by template.
///
/// Internally synchronized: the scheduler records samples while hosts read
/// estimates to build their task bundles, possibly from another thread.
#[derive(Debug)]
pub struct CostEstimator {
    default_estimate: u64,
    costs: Mutex<HashMap<TemplateKey, CostSample>>,
}

impl Default for CostEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_COST_ESTIMATE_NANOS)
    }
}

impl CostEstimator {
    /// Creates an estimator answering `default_estimate` for unseen keys.
    pub fn new(default_estimate: u64) -> Self {
        Self {
            default_estimate,
            costs: Mutex::new(HashMap::default()),
        }
    }

    /// Records a measured cost for `key`.
    ///
    /// The first sample is stored verbatim; later ones blend as
    /// `avg * 0.75 + sample * 0.25`.
    pub fn update(&self, key: &TemplateKey, sample: u64) {
        let mut costs = self.lock();
        let entry = costs.entry(key.clone()).or_default();
        entry.average = if entry.average == 0 {
            sample
        } else {
            (entry.average.saturating_mul(3).saturating_add(sample)) / 4
        };
        entry.samples += 1;
    }

    /// Returns the current average for `key`, or the default if never sampled.
    pub fn estimate(&self, key: &TemplateKey) -> u64 {
        self.lock()
            .get(key)
            .map(|cost| cost.average)
            .unwrap_or(self.default_estimate)
    }

    /// Number of samples recorded for `key`.
    pub fn sample_count(&self, key: &TemplateKey) -> u64 {
        self.lock().get(key).map(|cost| cost.samples).unwrap_or(0)
    }

    pub fn default_estimate(&self) -> u64 {
        self.default_estimate
    }

    /// Forgets every recorded sample.
    pub fn reset(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TemplateKey, CostSample>> {
        // Averages stay meaningful even if a writer panicked mid-update.
        self.costs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
