use std::rc::Rc;
use std::time::Duration;

use gapwork_core::{GapWorker, GapWorkerConfig, TaskError, TemplateKey};
use gapwork_foundation::{Constraints, ListPrefetcher, RowPipeline, ScrollActivity};
use gapwork_runtime_std::StdFrameClock;

const ITEM_COUNT: usize = 500;
const VIEWPORT_HEIGHT: f32 = 640.0;
const INITIAL_VELOCITY: f32 = 12_000.0;
const FRICTION: f32 = 0.97;
const STOP_VELOCITY: f32 = 20.0;

/// Stand-in for the template/binding/layout engines: sleeps to simulate work.
struct DemoPipeline;

impl DemoPipeline {
    fn row_height(template: &str) -> f32 {
        match template {
            "header" => 96.0,
            "card" => 72.0,
            _ => 48.0,
        }
    }
}

impl RowPipeline for DemoPipeline {
    type Tree = Vec<String>;
    type Geometry = (f32, f32);

    fn template_for(&self, position: usize) -> Option<TemplateKey> {
        if position >= ITEM_COUNT {
            return None;
        }
        let name = match position % 10 {
            0 => "header",
            1 | 4 | 7 => "card",
            _ => "compact",
        };
        Some(TemplateKey::new(name))
    }

    fn parse(&self, template: &TemplateKey) -> Result<Self::Tree, TaskError> {
        std::thread::sleep(Duration::from_micros(300));
        Ok(vec![template.to_string()])
    }

    fn bind(&self, mut tree: Self::Tree, position: usize) -> Result<Self::Tree, TaskError> {
        std::thread::sleep(Duration::from_micros(150));
        tree.push(format!("Item #{position}"));
        Ok(tree)
    }

    fn layout(
        &self,
        tree: &Self::Tree,
        constraints: &Constraints,
    ) -> Result<Self::Geometry, TaskError> {
        std::thread::sleep(Duration::from_micros(200));
        let template = tree.first().map(String::as_str).unwrap_or_default();
        Ok(constraints.constrain(f32::INFINITY, Self::row_height(template)))
    }
}

#[derive(Default)]
struct Tally {
    frames: u64,
    rows_shown: u64,
    prefetched: u64,
    inline: u64,
}

fn main() {
    #[cfg(feature = "logging")]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    println!("=== gapwork scroll demo ===");
    println!("Flinging through {ITEM_COUNT} rows at 60 Hz");

    let config = GapWorkerConfig::default();
    let frame_clock = Rc::new(StdFrameClock::new(config.refresh_rate_hz));
    let mut worker = GapWorker::new(config, frame_clock.clone(), Rc::new(frame_clock.clock()));

    let list = ListPrefetcher::new(DemoPipeline, &worker);
    list.set_constraints(Constraints::row(360.0));

    let mut offset = 0.0f32;
    let mut velocity = INITIAL_VELOCITY;
    let mut shown_until = 0usize;
    let mut tally = Tally::default();

    list.update_viewport(0..visible_end(offset), ITEM_COUNT);
    list.record_scroll_delta(velocity);
    list.set_activity(ScrollActivity::Fling, &mut worker);

    frame_clock.run_frames(|deadline| {
        tally.frames += 1;
        let dt = frame_clock.frame_interval_nanos() as f32 / 1e9;
        offset += velocity * dt;
        velocity *= FRICTION;

        let extent = list.viewport().average_item_extent();
        let first = (offset / extent) as usize;
        let end = (((offset + VIEWPORT_HEIGHT) / extent).ceil() as usize).min(ITEM_COUNT);
        for position in shown_until.max(first)..end {
            let cached = list.cache().has_cached(&position);
            match list.take_row(position) {
                Ok(row) => {
                    tally.rows_shown += 1;
                    if cached {
                        tally.prefetched += 1;
                    } else {
                        tally.inline += 1;
                    }
                    list.record_item_extent(row.geometry.1);
                }
                Err(err) => log::warn!("row {position} could not be shown: {err}"),
            }
        }
        shown_until = shown_until.max(end);
        list.update_viewport(first..end, ITEM_COUNT);

        if velocity < STOP_VELOCITY || end == ITEM_COUNT {
            list.record_scroll_delta(0.0);
            list.set_activity(ScrollActivity::Idle, &mut worker);
        } else {
            list.record_scroll_delta(velocity);
        }

        worker.tick(deadline);
        true
    });

    let stats = worker.stats();
    let cache = list.cache().stats();
    println!("frames:            {}", tally.frames);
    println!("rows shown:        {}", tally.rows_shown);
    println!("  prefetched:      {}", tally.prefetched);
    println!("  built inline:    {}", tally.inline);
    println!("tasks executed:    {}", stats.tasks_executed);
    println!("tasks deferred:    {}", stats.tasks_deferred);
    println!("low-budget frames: {}", stats.frames_skipped_low_budget);
    println!("cache hits/misses: {}/{}", cache.hits, cache.misses);
    for template in ["header", "card", "compact"] {
        let estimate = worker.cost_estimator().estimate(&TemplateKey::new(template));
        println!("estimate {template:<8} {:.2}ms", estimate as f64 / 1e6);
    }
}

fn visible_end(offset: f32) -> usize {
    let extent = gapwork_foundation::DEFAULT_ITEM_EXTENT_ESTIMATE;
    (((offset + VIEWPORT_HEIGHT) / extent).ceil() as usize).min(ITEM_COUNT)
}
