/// Lifetime counters of a [`GapWorker`](crate::GapWorker).
///
/// Used for testing and diagnosing prefetch effectiveness.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GapWorkerStats {
    /// Number of `tick` calls.
    pub frames: u64,

    /// Frames whose idle budget was below the minimum, so nothing ran.
    pub frames_skipped_low_budget: u64,

    /// Tasks that ran to completion successfully.
    pub tasks_executed: u64,

    /// Times a task was passed over because it did not fit the remaining budget.
    pub tasks_deferred: u64,

    /// Tasks that returned an error or panicked.
    pub tasks_failed: u64,

    /// Hosts dropped because they were deallocated while registered.
    pub hosts_dropped: u64,
}
