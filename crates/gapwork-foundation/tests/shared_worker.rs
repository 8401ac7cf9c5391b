use std::rc::Rc;

use gapwork_core::{GapWorker, GapWorkerConfig, TaskError, TemplateKey};
use gapwork_foundation::{Constraints, ListPrefetcher, RowPipeline, ScrollActivity};
use gapwork_testing::{ManualClock, TestFrameClock};

const MS: u64 = 1_000_000;

struct FeedPipeline {
    clock: Rc<ManualClock>,
    template: &'static str,
    stage_cost: u64,
}

impl RowPipeline for FeedPipeline {
    type Tree = Vec<String>;
    type Geometry = f32;

    fn template_for(&self, _position: usize) -> Option<TemplateKey> {
        Some(TemplateKey::new(self.template))
    }

    fn parse(&self, template: &TemplateKey) -> Result<Self::Tree, TaskError> {
        self.clock.advance(self.stage_cost);
        Ok(vec![template.to_string()])
    }

    fn bind(&self, mut tree: Self::Tree, position: usize) -> Result<Self::Tree, TaskError> {
        self.clock.advance(self.stage_cost);
        tree.push(format!("item {position}"));
        Ok(tree)
    }

    fn layout(&self, tree: &Self::Tree, constraints: &Constraints) -> Result<f32, TaskError> {
        self.clock.advance(self.stage_cost);
        let (_, height) = constraints.constrain(0.0, 24.0 * tree.len() as f32);
        Ok(height)
    }
}

fn worker() -> (GapWorker, Rc<TestFrameClock>, Rc<ManualClock>) {
    let frame_clock = Rc::new(TestFrameClock::new());
    let clock = Rc::new(ManualClock::new());
    let worker = GapWorker::new(
        GapWorkerConfig::default().with_prefetch_buffer_count(2),
        frame_clock.clone(),
        clock.clone(),
    );
    (worker, frame_clock, clock)
}

#[test]
fn two_lists_share_one_worker_and_one_frame_clock() {
    let (mut worker, frame_clock, clock) = worker();
    let feed = ListPrefetcher::new(
        FeedPipeline {
            clock: clock.clone(),
            template: "feed.card",
            stage_cost: 200_000,
        },
        &worker,
    );
    let chat = ListPrefetcher::new(
        FeedPipeline {
            clock: clock.clone(),
            template: "chat.bubble",
            stage_cost: 50_000,
        },
        &worker,
    );

    feed.update_viewport(0..4, 200);
    feed.record_scroll_delta(1.0);
    chat.update_viewport(20..30, 40);
    chat.record_scroll_delta(-1.0);

    feed.set_activity(ScrollActivity::Dragging, &mut worker);
    chat.set_activity(ScrollActivity::Fling, &mut worker);
    assert_eq!(frame_clock.start_count(), 1);

    worker.tick(clock.now() + 16 * MS);

    assert!(feed.cache().has_cached(&4));
    assert!(feed.cache().has_cached(&5));
    assert!(chat.cache().has_cached(&19));
    assert!(chat.cache().has_cached(&18));
    assert_eq!(feed.take_row(4).map(|row| row.geometry), Ok(48.0));

    feed.set_activity(ScrollActivity::Idle, &mut worker);
    assert_eq!(frame_clock.stop_count(), 0);
    chat.set_activity(ScrollActivity::Idle, &mut worker);
    assert_eq!(frame_clock.stop_count(), 1);
    assert!(!worker.has_pending_work());
}

#[test]
fn a_slow_template_is_spread_over_several_frames() {
    let (mut worker, _frame_clock, clock) = worker();
    let list = ListPrefetcher::new(
        FeedPipeline {
            clock: clock.clone(),
            template: "heavy",
            stage_cost: MS,
        },
        &worker,
    );
    list.update_viewport(0..3, 100);
    list.record_scroll_delta(1.0);
    list.set_activity(ScrollActivity::Fling, &mut worker);

    // 4ms of idle time per frame; each row costs 3ms.
    worker.tick(clock.now() + 8 * MS);
    assert_eq!(list.cache().len(), 1);

    worker.tick(clock.now() + 8 * MS);
    assert_eq!(list.cache().len(), 2);
    assert_eq!(
        worker.cost_estimator().estimate(&TemplateKey::new("heavy")),
        3 * MS
    );
}
