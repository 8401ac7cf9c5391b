//! The per-frame idle-time scheduler.
//!
//! Every frame the [`GapWorker`] asks each registered host to refresh its
//! [`TaskBundle`], merges all bundles into one priority order and runs tasks
//! front to back until half of the time left before the frame deadline is
//! used up. Measured task costs feed the shared [`CostEstimator`], so hosts
//! schedule later work with better estimates.
//!
//! The worker is single threaded: it is driven from one scheduling context
//! (the frame clock's callback) and `tick` is never reentrant. Registration
//! and submission must happen on that same context, which is why the worker
//! uses `Rc`/`Weak` and no locks.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::config::{GapWorkerConfig, MIN_FRAME_BUDGET_NANOS};
use crate::cost_estimator::CostEstimator;
use crate::error::TaskError;
use crate::frame_clock::FrameClock;
use crate::key::HostId;
use crate::platform::MonotonicClock;
use crate::stats::GapWorkerStats;
use crate::task::PrefetchTask;
use crate::task_bundle::TaskBundle;

/// A host that produces prefetch work.
///
/// Called once per frame while registered. Implementations typically build a
/// fresh [`TaskBundle`] and hand it to [`GapWorker::submit`], call
/// [`GapWorker::cancel`] when nothing is worth prefetching, or do nothing to
/// keep the previous bundle.
pub trait PrefetchCollector {
    fn collect_prefetch(&self, host: HostId, worker: &mut GapWorker);
}

struct HostEntry {
    id: HostId,
    collector: Option<Weak<dyn PrefetchCollector>>,
    bundle: Option<TaskBundle>,
}

impl HostEntry {
    fn is_empty(&self) -> bool {
        self.collector.is_none() && self.bundle.is_none()
    }

    fn collector_dead(&self) -> bool {
        self.collector
            .as_ref()
            .is_some_and(|collector| collector.strong_count() == 0)
    }

    fn bundle_orphaned(&self) -> bool {
        self.bundle
            .as_ref()
            .is_some_and(|bundle| !bundle.is_host_alive())
    }
}

/// Position of one task in the merged, priority-sorted order.
#[derive(Clone, Copy, Debug)]
struct FlatTask {
    host: HostId,
    index: usize,
    priority: i64,
}

/// Idle-time prefetch scheduler.
///
/// Construct one per UI context and pass it to hosts explicitly. Dropping the
/// worker stops its frame clock.
pub struct GapWorker {
    config: GapWorkerConfig,
    frame_budget: u64,
    frame_clock: Rc<dyn FrameClock>,
    clock: Rc<dyn MonotonicClock>,
    cost_estimator: Arc<CostEstimator>,
    /// Registration order doubles as the cross-host tie-break order.
    hosts: Vec<HostEntry>,
    flat: Vec<FlatTask>,
    dirty: bool,
    clock_running: bool,
    stats: GapWorkerStats,
}

impl GapWorker {
    /// Creates a worker. Invalid configuration values are clamped to defaults.
    pub fn new(
        config: GapWorkerConfig,
        frame_clock: Rc<dyn FrameClock>,
        clock: Rc<dyn MonotonicClock>,
    ) -> Self {
        let config = config.validated();
        let cost_estimator = Arc::new(CostEstimator::new(config.default_cost_estimate_nanos));
        Self {
            frame_budget: config.frame_budget_nanos(),
            config,
            frame_clock,
            clock,
            cost_estimator,
            hosts: Vec::new(),
            flat: Vec::new(),
            dirty: false,
            clock_running: false,
            stats: GapWorkerStats::default(),
        }
    }

    /// Replaces the cost estimator, e.g. to share one across workers.
    pub fn with_cost_estimator(mut self, cost_estimator: Arc<CostEstimator>) -> Self {
        self.cost_estimator = cost_estimator;
        self
    }

    pub fn config(&self) -> &GapWorkerConfig {
        &self.config
    }

    /// Estimator that receives the measured cost of every executed task.
    pub fn cost_estimator(&self) -> &Arc<CostEstimator> {
        &self.cost_estimator
    }

    /// Idle-time budget of a full frame at the current refresh rate.
    pub fn frame_budget_nanos(&self) -> u64 {
        self.frame_budget
    }

    /// Re-derives the frame budget after a display mode change.
    pub fn set_refresh_rate(&mut self, refresh_rate_hz: i32) {
        self.config = self
            .config
            .clone()
            .with_refresh_rate(refresh_rate_hz)
            .validated();
        self.frame_budget = self.config.frame_budget_nanos();
        log::debug!(
            "gap worker refresh rate {} Hz, frame budget {}ns",
            self.config.refresh_rate_hz,
            self.frame_budget
        );
    }

    pub fn stats(&self) -> GapWorkerStats {
        self.stats.clone()
    }

    /// Registers (or replaces) the collector for `host`.
    ///
    /// Starts the frame clock when this is the first registered collector.
    pub fn register_collector(&mut self, host: HostId, collector: Weak<dyn PrefetchCollector>) {
        match self.entry_mut(host) {
            Some(entry) => entry.collector = Some(collector),
            None => self.hosts.push(HostEntry {
                id: host,
                collector: Some(collector),
                bundle: None,
            }),
        }
        self.dirty = true;
        self.start_clock_if_needed();
    }

    /// Removes the collector and bundle of `host`.
    ///
    /// Stops the frame clock when no collector remains.
    pub fn unregister_collector(&mut self, host: HostId) {
        self.hosts.retain(|entry| entry.id != host);
        self.dirty = true;
        self.stop_clock_if_idle();
    }

    /// Replaces the bundle of `host`.
    ///
    /// Submitting for a host without a registered collector is allowed: the
    /// bundle is kept as a standing task source and drained by later ticks.
    /// It does not start the frame clock on its own.
    pub fn submit(&mut self, host: HostId, bundle: TaskBundle) {
        match self.entry_mut(host) {
            Some(entry) => entry.bundle = Some(bundle),
            None => self.hosts.push(HostEntry {
                id: host,
                collector: None,
                bundle: Some(bundle),
            }),
        }
        self.dirty = true;
    }

    /// Drops the bundle of `host` but keeps its collector registered.
    pub fn cancel(&mut self, host: HostId) {
        if let Some(entry) = self.entry_mut(host) {
            entry.bundle = None;
        }
        self.hosts.retain(|entry| !entry.is_empty());
        self.dirty = true;
    }

    /// True iff any collector or bundle is registered.
    pub fn has_pending_work(&self) -> bool {
        !self.hosts.is_empty()
    }

    pub fn is_registered(&self, host: HostId) -> bool {
        self.entry(host)
            .is_some_and(|entry| entry.collector.is_some())
    }

    /// Current bundle of `host`, if any.
    pub fn bundle(&self, host: HostId) -> Option<&TaskBundle> {
        self.entry(host).and_then(|entry| entry.bundle.as_ref())
    }

    /// Tasks waiting across all bundles.
    pub fn pending_task_count(&self) -> usize {
        self.hosts
            .iter()
            .filter_map(|entry| entry.bundle.as_ref())
            .map(TaskBundle::len)
            .sum()
    }

    /// Runs one frame of prefetch work against `frame_deadline_nanos`.
    ///
    /// Never panics on task failure or host teardown: failed tasks are logged
    /// and skipped, deallocated hosts are dropped silently.
    pub fn tick(&mut self, frame_deadline_nanos: u64) {
        self.stats.frames += 1;
        self.collect();

        if self.hosts.iter().all(|entry| entry.bundle.is_none()) {
            return;
        }

        if self.dirty {
            self.rebuild_flat_list();
        }

        let now = self.clock.now_nanos();
        let budget = self.budget_for(now, frame_deadline_nanos);
        if budget < MIN_FRAME_BUDGET_NANOS {
            self.stats.frames_skipped_low_budget += 1;
            log::trace!("gap worker: {budget}ns left this frame, deferring prefetch");
            return;
        }

        self.execute(budget);
        self.drop_dead_hosts();
    }

    /// Budget for this frame: half the time left until the deadline, capped
    /// at the configured frame budget.
    fn budget_for(&self, now: u64, frame_deadline: u64) -> u64 {
        (frame_deadline.saturating_sub(now) / 2).min(self.frame_budget)
    }

    fn collect(&mut self) {
        let collectors: SmallVec<[(HostId, Weak<dyn PrefetchCollector>); 4]> = self
            .hosts
            .iter()
            .filter_map(|entry| entry.collector.clone().map(|c| (entry.id, c)))
            .collect();

        for (host, collector) in collectors {
            // A collector may have unregistered another host during this pass.
            if !self.is_registered(host) {
                continue;
            }
            match collector.upgrade() {
                Some(collector) => collector.collect_prefetch(host, self),
                None => log::trace!("gap worker: {host} gone before collection"),
            }
        }

        self.drop_dead_hosts();
    }

    fn rebuild_flat_list(&mut self) {
        self.flat.clear();
        for entry in &mut self.hosts {
            let Some(bundle) = entry.bundle.as_mut() else {
                continue;
            };
            bundle.sort();
            self.flat.extend(bundle.tasks().enumerate().map(|(index, task)| FlatTask {
                host: entry.id,
                index,
                priority: task.priority(),
            }));
        }
        // Stable: equal priorities keep host registration order, then bundle order.
        self.flat.sort_by_key(|task| task.priority);
        self.dirty = false;
        log::trace!("gap worker: {} tasks queued", self.flat.len());
    }

    fn execute(&mut self, budget: u64) {
        let flat = std::mem::take(&mut self.flat);
        let mut remaining = i64::try_from(budget).unwrap_or(i64::MAX);
        let mut executed: SmallVec<[FlatTask; 8]> = SmallVec::new();

        for slot in &flat {
            let Some(entry) = self.hosts.iter_mut().find(|entry| entry.id == slot.host) else {
                continue;
            };
            let Some(bundle) = entry.bundle.as_mut() else {
                continue;
            };
            if !bundle.is_host_alive() {
                continue;
            }
            let Some(task) = bundle.task_mut(slot.index) else {
                continue;
            };

            let estimated = i64::try_from(task.estimated_cost()).unwrap_or(i64::MAX);
            if remaining < estimated && !task.force_run() {
                self.stats.tasks_deferred += 1;
                continue;
            }

            let started = self.clock.now_nanos();
            let outcome = run_contained(task);
            let elapsed = self.clock.now_nanos().saturating_sub(started);
            remaining = remaining.saturating_sub(i64::try_from(elapsed).unwrap_or(i64::MAX));

            match outcome {
                Ok(()) => {
                    self.stats.tasks_executed += 1;
                    if let Some(key) = task.cost_key() {
                        self.cost_estimator.update(key, elapsed);
                    }
                    log::trace!("gap worker: {} ran in {elapsed}ns", task.id());
                }
                Err(err) => {
                    self.stats.tasks_failed += 1;
                    log::warn!("prefetch {} for {} failed: {err}", task.id(), slot.host);
                }
            }
            executed.push(*slot);

            if remaining <= 0 {
                break;
            }
        }

        self.flat = flat;
        if !executed.is_empty() {
            self.remove_executed(&executed);
        }
    }

    fn remove_executed(&mut self, executed: &[FlatTask]) {
        for entry in &mut self.hosts {
            let mut indices: SmallVec<[usize; 8]> = executed
                .iter()
                .filter(|slot| slot.host == entry.id)
                .map(|slot| slot.index)
                .collect();
            if indices.is_empty() {
                continue;
            }
            if let Some(bundle) = entry.bundle.as_mut() {
                bundle.remove_indices(&mut indices);
                if bundle.is_empty() {
                    entry.bundle = None;
                }
            }
        }
        self.hosts.retain(|entry| !entry.is_empty());
        self.dirty = true;
    }

    /// Forgets deallocated collectors and bundles whose owner is gone.
    ///
    /// A dead bundle owner only costs the entry its tasks; the entry is
    /// removed once neither a live collector nor a bundle is left.
    fn drop_dead_hosts(&mut self) {
        let mut changed = false;
        let mut dropped = 0u64;
        for entry in &mut self.hosts {
            if entry.collector_dead() {
                log::debug!("gap worker: dropping deallocated {}", entry.id);
                entry.collector = None;
                entry.bundle = None;
                changed = true;
                dropped += 1;
            } else if entry.bundle_orphaned() {
                log::debug!("gap worker: discarding bundle of {}, owner gone", entry.id);
                entry.bundle = None;
                changed = true;
                if entry.collector.is_none() {
                    dropped += 1;
                }
            }
        }
        if changed {
            self.hosts.retain(|entry| !entry.is_empty());
            self.stats.hosts_dropped += dropped;
            self.dirty = true;
            self.stop_clock_if_idle();
        }
    }

    fn start_clock_if_needed(&mut self) {
        if !self.clock_running && self.has_collectors() {
            self.clock_running = true;
            log::debug!("gap worker: starting frame clock");
            self.frame_clock.start();
        }
    }

    fn stop_clock_if_idle(&mut self) {
        if self.clock_running && !self.has_collectors() {
            self.clock_running = false;
            log::debug!("gap worker: stopping frame clock");
            self.frame_clock.stop();
        }
    }

    fn has_collectors(&self) -> bool {
        self.hosts.iter().any(|entry| entry.collector.is_some())
    }

    fn entry(&self, host: HostId) -> Option<&HostEntry> {
        self.hosts.iter().find(|entry| entry.id == host)
    }

    fn entry_mut(&mut self, host: HostId) -> Option<&mut HostEntry> {
        self.hosts.iter_mut().find(|entry| entry.id == host)
    }
}

impl Drop for GapWorker {
    fn drop(&mut self) {
        if self.clock_running {
            self.clock_running = false;
            self.frame_clock.stop();
        }
    }
}

impl std::fmt::Debug for GapWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GapWorker")
            .field("frame_budget", &self.frame_budget)
            .field("host_count", &self.hosts.len())
            .field("queued_tasks", &self.flat.len())
            .field("dirty", &self.dirty)
            .field("clock_running", &self.clock_running)
            .finish()
    }
}

/// Runs `task`, turning a panic into [`TaskError::Panicked`].
fn run_contained(task: &mut (dyn PrefetchTask + 'static)) -> Result<(), TaskError> {
    match panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
        Ok(result) => result,
        Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
#[path = "tests/gap_worker_tests.rs"]
mod tests;
