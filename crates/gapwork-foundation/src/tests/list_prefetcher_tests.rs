use std::cell::Cell;
use std::rc::Rc;

use gapwork_core::{GapWorker, GapWorkerConfig, PrefetchTask, TaskError, TemplateKey};
use gapwork_testing::{ManualClock, TestFrameClock};

use super::*;
use crate::activity::ActivityTransition;

const MS: u64 = 1_000_000;

/// Rows alternate between two templates; each stage costs 100µs of clock time.
struct TestPipeline {
    clock: Rc<ManualClock>,
    item_count: usize,
    parses: Cell<usize>,
    broken_layout: Option<usize>,
}

impl TestPipeline {
    fn new(clock: &Rc<ManualClock>, item_count: usize) -> Self {
        Self {
            clock: clock.clone(),
            item_count,
            parses: Cell::new(0),
            broken_layout: None,
        }
    }
}

impl RowPipeline for TestPipeline {
    type Tree = String;
    type Geometry = (f32, f32);

    fn template_for(&self, position: usize) -> Option<TemplateKey> {
        if position >= self.item_count {
            return None;
        }
        Some(TemplateKey::new(if position % 2 == 0 { "even" } else { "odd" }))
    }

    fn parse(&self, template: &TemplateKey) -> Result<String, TaskError> {
        self.clock.advance(100_000);
        self.parses.set(self.parses.get() + 1);
        Ok(template.to_string())
    }

    fn bind(&self, tree: String, position: usize) -> Result<String, TaskError> {
        self.clock.advance(100_000);
        Ok(format!("{tree}:{position}"))
    }

    fn layout(&self, tree: &String, constraints: &Constraints) -> Result<(f32, f32), TaskError> {
        self.clock.advance(100_000);
        if let Some(position) = self.broken_layout {
            if tree.ends_with(&format!(":{position}")) {
                return Err(TaskError::Layout {
                    position,
                    reason: "negative padding".into(),
                });
            }
        }
        Ok(constraints.constrain(200.0, 40.0))
    }
}

struct Fixture {
    worker: GapWorker,
    frame_clock: Rc<TestFrameClock>,
    clock: Rc<ManualClock>,
}

impl Fixture {
    fn new() -> Self {
        let frame_clock = Rc::new(TestFrameClock::new());
        let clock = Rc::new(ManualClock::starting_at(10 * MS));
        let worker = GapWorker::new(
            GapWorkerConfig::default(),
            frame_clock.clone(),
            clock.clone(),
        );
        Self {
            worker,
            frame_clock,
            clock,
        }
    }

    fn pipeline(&self, item_count: usize) -> TestPipeline {
        TestPipeline::new(&self.clock, item_count)
    }

    fn full_frame(&mut self) {
        let deadline = self.clock.now() + 16 * MS;
        self.worker.tick(deadline);
    }

    /// A frame with no idle time: collection happens, execution does not.
    fn busy_frame(&mut self) {
        let deadline = self.clock.now();
        self.worker.tick(deadline);
    }
}

#[test]
fn activity_drives_registration_and_frame_clock() {
    let mut fx = Fixture::new();
    let list = ListPrefetcher::new(fx.pipeline(100), &fx.worker);

    assert_eq!(
        list.set_activity(ScrollActivity::Dragging, &mut fx.worker),
        ActivityTransition::Activated
    );
    assert!(fx.worker.is_registered(list.host()));
    assert_eq!(
        list.set_activity(ScrollActivity::Fling, &mut fx.worker),
        ActivityTransition::Unchanged
    );
    assert_eq!(fx.frame_clock.start_count(), 1);

    list.set_activity(ScrollActivity::Idle, &mut fx.worker);
    assert!(!fx.worker.is_registered(list.host()));
    assert_eq!(fx.frame_clock.stop_count(), 1);
}

#[test]
fn forward_fling_prepares_rows_past_the_bottom_edge() {
    let mut fx = Fixture::new();
    let list = ListPrefetcher::new(fx.pipeline(100), &fx.worker);
    list.update_viewport(0..5, 100);
    list.record_scroll_delta(12.0);
    list.set_activity(ScrollActivity::Fling, &mut fx.worker);

    fx.full_frame();

    assert_eq!(list.candidates(), vec![5, 6, 7]);
    for position in 5..8 {
        assert!(list.cache().has_cached(&position), "row {position}");
    }
    let parses = list.pipeline().parses.get();
    let row = list.take_row(6).expect("prefetched row");
    assert_eq!(row.tree, "even:6");
    assert_eq!(row.template.as_str(), "even");
    assert_eq!(list.pipeline().parses.get(), parses);
}

#[test]
fn backward_scroll_prefetches_above_the_top_edge_nearest_first() {
    let mut fx = Fixture::new();
    let list = ListPrefetcher::new(fx.pipeline(100), &fx.worker);
    list.update_viewport(10..15, 100);
    list.record_scroll_delta(-4.0);
    list.set_activity(ScrollActivity::Dragging, &mut fx.worker);

    fx.busy_frame();

    assert_eq!(list.candidates(), vec![9, 8, 7]);
    let bundle = fx.worker.bundle(list.host()).expect("submitted bundle");
    let ids: Vec<u64> = bundle.tasks().map(|task| task.id().0).collect();
    assert_eq!(ids, vec![9, 8, 7]);
}

#[test]
fn priority_is_the_rounded_up_distance() {
    let mut fx = Fixture::new();
    let list = ListPrefetcher::new(fx.pipeline(100), &fx.worker);
    list.record_item_extent(10.5);
    list.update_viewport(0..2, 100);
    list.record_scroll_delta(1.0);
    list.set_activity(ScrollActivity::Fling, &mut fx.worker);

    fx.busy_frame();

    let bundle = fx.worker.bundle(list.host()).expect("submitted bundle");
    let priorities: Vec<i64> = bundle.tasks().map(|task| task.priority()).collect();
    assert_eq!(priorities, vec![11, 21, 32]);
}

#[test]
fn estimates_come_from_the_shared_estimator() {
    let mut fx = Fixture::new();
    let list = ListPrefetcher::new(fx.pipeline(100), &fx.worker);
    fx.worker
        .cost_estimator()
        .update(&TemplateKey::new("odd"), 750_000);
    list.update_viewport(0..5, 100);
    list.record_scroll_delta(1.0);
    list.set_activity(ScrollActivity::Fling, &mut fx.worker);

    fx.busy_frame();

    let bundle = fx.worker.bundle(list.host()).expect("submitted bundle");
    let costs: Vec<u64> = bundle.tasks().map(|task| task.estimated_cost()).collect();
    let default = fx.worker.config().default_cost_estimate_nanos;
    assert_eq!(costs, vec![750_000, default, 750_000]);
}

#[test]
fn executed_rows_feed_measured_cost_back() {
    let mut fx = Fixture::new();
    let list = ListPrefetcher::new(fx.pipeline(100), &fx.worker);
    list.update_viewport(0..5, 100);
    list.record_scroll_delta(1.0);
    list.set_activity(ScrollActivity::Fling, &mut fx.worker);

    fx.full_frame();

    let estimator = fx.worker.cost_estimator();
    assert_eq!(estimator.sample_count(&TemplateKey::new("odd")), 2);
    assert_eq!(estimator.estimate(&TemplateKey::new("odd")), 300_000);
    assert_eq!(estimator.estimate(&TemplateKey::new("even")), 300_000);
}

#[test]
fn cached_rows_are_not_scheduled_again() {
    let mut fx = Fixture::new();
    let list = ListPrefetcher::new(fx.pipeline(100), &fx.worker);
    list.update_viewport(0..5, 100);
    list.record_scroll_delta(1.0);
    list.set_activity(ScrollActivity::Fling, &mut fx.worker);

    fx.full_frame();
    let parses = list.pipeline().parses.get();
    fx.busy_frame();

    assert!(fx.worker.bundle(list.host()).is_none());
    assert!(fx.worker.is_registered(list.host()));
    assert_eq!(list.pipeline().parses.get(), parses);
}

#[test]
fn idle_direction_cancels_pending_rows() {
    let mut fx = Fixture::new();
    let list = ListPrefetcher::new(fx.pipeline(100), &fx.worker);
    list.update_viewport(0..5, 100);
    list.record_scroll_delta(1.0);
    list.set_activity(ScrollActivity::Dragging, &mut fx.worker);
    fx.busy_frame();
    assert_eq!(fx.worker.pending_task_count(), 3);

    list.record_scroll_delta(0.0);
    fx.busy_frame();

    assert_eq!(fx.worker.pending_task_count(), 0);
    assert!(list.candidates().is_empty());
}

#[test]
fn rows_without_data_are_skipped() {
    let mut fx = Fixture::new();
    let list = ListPrefetcher::new(fx.pipeline(6), &fx.worker);
    // The list believes there are more rows than the data set has.
    list.update_viewport(0..5, 20);
    list.record_scroll_delta(1.0);
    list.set_activity(ScrollActivity::Fling, &mut fx.worker);

    fx.busy_frame();

    let bundle = fx.worker.bundle(list.host()).expect("submitted bundle");
    assert_eq!(bundle.len(), 1);
}

#[test]
fn take_row_builds_inline_on_a_miss() {
    let fx = Fixture::new();
    let list = ListPrefetcher::new(fx.pipeline(100), &fx.worker);
    list.set_constraints(Constraints::row(320.0));

    let row = list.take_row(42).expect("inline row");
    assert_eq!(row.geometry, (320.0, 40.0));
    assert_eq!(list.cache().stats().misses, 1);
    assert_eq!(
        list.take_row(500),
        Err(TaskError::MissingData { position: 500 })
    );
}

#[test]
fn failed_rows_are_not_cached() {
    let mut fx = Fixture::new();
    let mut pipeline = fx.pipeline(100);
    pipeline.broken_layout = Some(6);
    let list = ListPrefetcher::new(pipeline, &fx.worker);
    list.update_viewport(0..5, 100);
    list.record_scroll_delta(1.0);
    list.set_activity(ScrollActivity::Fling, &mut fx.worker);

    fx.full_frame();

    assert!(list.cache().has_cached(&5));
    assert!(!list.cache().has_cached(&6));
    assert!(list.cache().has_cached(&7));
    assert_eq!(fx.worker.stats().tasks_failed, 1);
}

#[test]
fn data_change_and_new_constraints_invalidate_the_cache() {
    let mut fx = Fixture::new();
    let list = ListPrefetcher::new(fx.pipeline(100), &fx.worker);
    list.update_viewport(0..5, 100);
    list.record_scroll_delta(1.0);
    list.set_activity(ScrollActivity::Fling, &mut fx.worker);
    fx.full_frame();
    assert_eq!(list.cache().len(), 3);

    list.invalidate_data(50);
    assert!(list.cache().is_empty());
    assert_eq!(list.viewport().total_count(), 50);

    fx.full_frame();
    assert_eq!(list.cache().len(), 3);
    list.set_constraints(Constraints::row(100.0));
    assert!(list.cache().is_empty());
}

#[test]
fn disabled_strategy_never_submits() {
    let mut fx = Fixture::new();
    let list =
        ListPrefetcher::with_strategy(fx.pipeline(100), &fx.worker, PrefetchStrategy::disabled());
    list.update_viewport(0..5, 100);
    list.record_scroll_delta(1.0);
    list.set_activity(ScrollActivity::Fling, &mut fx.worker);

    fx.full_frame();

    assert!(fx.worker.bundle(list.host()).is_none());
    assert!(list.cache().is_empty());
}

#[test]
fn dropped_list_is_forgotten_by_the_worker() {
    let mut fx = Fixture::new();
    let list = ListPrefetcher::new(fx.pipeline(100), &fx.worker);
    list.update_viewport(0..5, 100);
    list.record_scroll_delta(1.0);
    list.set_activity(ScrollActivity::Fling, &mut fx.worker);
    fx.busy_frame();
    let host = list.host();

    drop(list);
    fx.full_frame();

    assert!(!fx.worker.has_pending_work());
    assert!(fx.worker.bundle(host).is_none());
    assert_eq!(fx.frame_clock.stop_count(), 1);
}
