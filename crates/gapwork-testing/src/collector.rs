use std::cell::Cell;
use std::rc::{Rc, Weak};

use gapwork_core::{GapWorker, HostId, PrefetchCollector};

/// A collector backed by a closure, counting its invocations.
pub struct CollectorFn<F> {
    collect: F,
    calls: Cell<usize>,
}

impl<F> CollectorFn<F>
where
    F: Fn(HostId, &mut GapWorker) + 'static,
{
    pub fn new(collect: F) -> Rc<Self> {
        Rc::new(Self {
            collect,
            calls: Cell::new(0),
        })
    }

    /// Weak handle suitable for [`GapWorker::register_collector`] and
    /// [`TaskBundle::new`](gapwork_core::TaskBundle::new).
    pub fn handle(self: &Rc<Self>) -> Weak<dyn PrefetchCollector> {
        let this: Rc<dyn PrefetchCollector> = self.clone();
        Rc::downgrade(&this)
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl<F> PrefetchCollector for CollectorFn<F>
where
    F: Fn(HostId, &mut GapWorker),
{
    fn collect_prefetch(&self, host: HostId, worker: &mut GapWorker) {
        self.calls.set(self.calls.get() + 1);
        (self.collect)(host, worker);
    }
}

/// A collector that never submits anything.
pub fn idle_collector() -> Rc<CollectorFn<impl Fn(HostId, &mut GapWorker)>> {
    CollectorFn::new(|_: HostId, _: &mut GapWorker| {})
}
