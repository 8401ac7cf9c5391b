use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gapwork_core::{FnTask, GapWorker, GapWorkerConfig, HostId, TaskBundle, TaskId};
use gapwork_testing::{ManualClock, TestFrameClock};

const HOST_SAMPLES: &[usize] = &[1, 4, 16];
const TASKS_PER_HOST: usize = 32;
const TASK_COST_NANOS: u64 = 50_000;

fn fill(worker: &mut GapWorker, hosts: &[HostId], clock: &Rc<ManualClock>) {
    for (h, &host) in hosts.iter().enumerate() {
        let mut bundle = TaskBundle::detached();
        for i in 0..TASKS_PER_HOST {
            let clock = clock.clone();
            let priority = ((i * 7 + h * 3) % TASKS_PER_HOST) as i64;
            bundle.add(Box::new(FnTask::new(
                TaskId(i as u64),
                priority,
                TASK_COST_NANOS,
                move || {
                    clock.advance(TASK_COST_NANOS);
                    Ok(())
                },
            )));
        }
        worker.submit(host, bundle);
    }
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("gap_worker_tick");
    for &host_count in HOST_SAMPLES {
        group.bench_with_input(
            BenchmarkId::from_parameter(host_count),
            &host_count,
            |b, &host_count| {
                let clock = Rc::new(ManualClock::new());
                let mut worker = GapWorker::new(
                    GapWorkerConfig::default(),
                    Rc::new(TestFrameClock::new()),
                    clock.clone(),
                );
                let hosts: Vec<HostId> = (0..host_count).map(|_| HostId::next()).collect();
                b.iter(|| {
                    fill(&mut worker, &hosts, &clock);
                    let deadline = clock.now() + 16_666_666;
                    worker.tick(black_box(deadline));
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
