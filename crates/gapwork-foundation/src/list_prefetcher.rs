//! The list host that feeds the gap worker.
//!
//! A [`ListPrefetcher`] turns the list's viewport into row tasks every frame
//! while the list is moving, and hands out the rows those tasks prepared.

use std::cell::RefCell;
use std::fmt;
use std::ops::Range;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use gapwork_core::{
    CostEstimator, GapWorker, HostId, PositionCollector, PrefetchCache, PrefetchCollector,
    PrefetchTask, TaskBundle, TaskError, TaskId, TemplateKey,
};
use smallvec::SmallVec;

use crate::activity::{ActivityTransition, HostActivity, ScrollActivity};
use crate::constraints::Constraints;
use crate::pipeline::{build_row, prepare_row, PreparedRow, RowPipeline};
use crate::prefetch::PrefetchStrategy;
use crate::viewport::ViewportTracker;

/// Cache of prepared rows, keyed by list position and namespaced by template.
pub type RowCache<P> =
    PrefetchCache<usize, PreparedRow<<P as RowPipeline>::Tree, <P as RowPipeline>::Geometry>>;

struct ListState {
    activity: HostActivity,
    viewport: ViewportTracker,
    positions: PositionCollector,
    constraints: Constraints,
}

/// Prefetch host for one scrollable list.
pub struct ListPrefetcher<P: RowPipeline> {
    host: HostId,
    this: Weak<Self>,
    pipeline: Rc<P>,
    cache: Arc<RowCache<P>>,
    cost_estimator: Arc<CostEstimator>,
    strategy: PrefetchStrategy,
    state: RefCell<ListState>,
}

impl<P: RowPipeline> ListPrefetcher<P> {
    /// Creates a prefetcher sharing `worker`'s cost estimator and using its
    /// buffer count and cache capacity.
    pub fn new(pipeline: P, worker: &GapWorker) -> Rc<Self> {
        Self::with_strategy(pipeline, worker, PrefetchStrategy::from_config(worker.config()))
    }

    pub fn with_strategy(
        pipeline: P,
        worker: &GapWorker,
        strategy: PrefetchStrategy,
    ) -> Rc<Self> {
        let cache = Arc::new(PrefetchCache::new(worker.config().cache_capacity));
        let cost_estimator = worker.cost_estimator().clone();
        Rc::new_cyclic(|this| Self {
            host: HostId::next(),
            this: this.clone(),
            pipeline: Rc::new(pipeline),
            cache,
            cost_estimator,
            strategy,
            state: RefCell::new(ListState {
                activity: HostActivity::new(),
                viewport: ViewportTracker::new(),
                positions: PositionCollector::new(),
                constraints: Constraints::default(),
            }),
        })
    }

    pub fn host(&self) -> HostId {
        self.host
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn cache(&self) -> &Arc<RowCache<P>> {
        &self.cache
    }

    pub fn strategy(&self) -> &PrefetchStrategy {
        &self.strategy
    }

    pub fn activity(&self) -> ScrollActivity {
        self.state.borrow().activity.state()
    }

    /// Switches scroll activity, registering with or unregistering from
    /// `worker` when prefetch turns on or off.
    pub fn set_activity(
        &self,
        activity: ScrollActivity,
        worker: &mut GapWorker,
    ) -> ActivityTransition {
        let transition = self.state.borrow_mut().activity.transition(activity);
        match transition {
            ActivityTransition::Activated => {
                log::debug!("{}: {activity:?}, prefetch on", self.host);
                worker.register_collector(self.host, self.collector_handle());
            }
            ActivityTransition::Deactivated => {
                log::debug!("{}: idle, prefetch off", self.host);
                self.state.borrow_mut().positions.clear();
                worker.unregister_collector(self.host);
            }
            ActivityTransition::Unchanged => {}
        }
        transition
    }

    pub fn update_viewport(&self, visible: Range<usize>, total_count: usize) {
        self.state
            .borrow_mut()
            .viewport
            .set_visible(visible, total_count);
    }

    pub fn record_scroll_delta(&self, delta: f32) {
        self.state.borrow_mut().viewport.record_scroll_delta(delta);
    }

    pub fn record_item_extent(&self, extent: f32) {
        self.state.borrow_mut().viewport.record_item_extent(extent);
    }

    /// Sets the constraints rows are laid out against.
    ///
    /// Rows prepared under different constraints are discarded.
    pub fn set_constraints(&self, constraints: Constraints) {
        let mut state = self.state.borrow_mut();
        if state.constraints != constraints {
            state.constraints = constraints;
            self.cache.clear_all();
        }
    }

    pub fn viewport(&self) -> ViewportTracker {
        self.state.borrow().viewport.clone()
    }

    /// Candidates found by the last collection, nearest first.
    pub fn candidates(&self) -> Vec<usize> {
        self.state
            .borrow()
            .positions
            .positions()
            .into_iter()
            .map(|info| info.position)
            .collect()
    }

    /// Returns the row for `position`, prepared ahead of time if possible.
    ///
    /// A cache miss builds the row synchronously.
    pub fn take_row(
        &self,
        position: usize,
    ) -> Result<PreparedRow<P::Tree, P::Geometry>, TaskError> {
        if let Some(row) = self.cache.get(&position) {
            return Ok(row);
        }
        let constraints = self.state.borrow().constraints;
        log::trace!("{}: row {position} not prefetched, building inline", self.host);
        build_row(&*self.pipeline, position, &constraints)
    }

    /// Drops every prepared row after the underlying data changed.
    pub fn invalidate_data(&self, total_count: usize) {
        let mut state = self.state.borrow_mut();
        let visible = state.viewport.visible();
        state.viewport.set_visible(visible, total_count);
        state.positions.clear();
        self.cache.clear_all();
    }

    fn collector_handle(&self) -> Weak<dyn PrefetchCollector> {
        self.this.clone()
    }

    fn row_task(
        &self,
        position: usize,
        distance: f32,
        constraints: Constraints,
    ) -> Option<RowPrefetchTask<P>> {
        let template = self.pipeline.template_for(position)?;
        Some(RowPrefetchTask {
            position,
            priority: distance.ceil() as i64,
            estimated_cost: self.cost_estimator.estimate(&template),
            template,
            constraints,
            pipeline: self.pipeline.clone(),
            cache: self.cache.clone(),
        })
    }
}

impl<P: RowPipeline> PrefetchCollector for ListPrefetcher<P> {
    fn collect_prefetch(&self, host: HostId, worker: &mut GapWorker) {
        let (candidates, constraints) = {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            state.positions.clear();
            let snapshot = state.viewport.snapshot();
            state
                .positions
                .collect(&snapshot, self.strategy.effective_buffer_count());
            let candidates: SmallVec<[(usize, f32); 8]> = state
                .positions
                .positions()
                .into_iter()
                .map(|info| (info.position, info.distance))
                .collect();
            (candidates, state.constraints)
        };

        let mut bundle = TaskBundle::new(self.collector_handle());
        for (position, distance) in candidates {
            if self.cache.has_cached(&position) {
                continue;
            }
            if let Some(task) = self.row_task(position, distance, constraints) {
                bundle.add(Box::new(task));
            }
        }

        if bundle.is_empty() {
            worker.cancel(host);
        } else {
            log::trace!("{host}: {} rows to prefetch", bundle.len());
            worker.submit(host, bundle);
        }
    }
}

impl<P: RowPipeline> fmt::Debug for ListPrefetcher<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ListPrefetcher")
            .field("host", &self.host)
            .field("activity", &state.activity.state())
            .field("viewport", &state.viewport)
            .field("strategy", &self.strategy)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Prepares one row and stores it in the row cache.
struct RowPrefetchTask<P: RowPipeline> {
    position: usize,
    priority: i64,
    estimated_cost: u64,
    template: TemplateKey,
    constraints: Constraints,
    pipeline: Rc<P>,
    cache: Arc<RowCache<P>>,
}

impl<P: RowPipeline> PrefetchTask for RowPrefetchTask<P> {
    fn id(&self) -> TaskId {
        TaskId::from(self.position)
    }

    fn estimated_cost(&self) -> u64 {
        self.estimated_cost
    }

    fn priority(&self) -> i64 {
        self.priority
    }

    fn cost_key(&self) -> Option<&TemplateKey> {
        Some(&self.template)
    }

    fn run(&mut self) -> Result<(), TaskError> {
        if self.cache.has_cached(&self.position) {
            return Ok(());
        }
        let row = prepare_row(
            &*self.pipeline,
            self.template.clone(),
            self.position,
            &self.constraints,
        )?;
        self.cache.cache(self.template.clone(), self.position, row);
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/list_prefetcher_tests.rs"]
mod tests;
