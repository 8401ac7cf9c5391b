//! Host-side building blocks for idle-time list prefetching.
//!
//! A scrollable list owns a [`ListPrefetcher`]. The list feeds it viewport
//! and scroll state, flips its [`ScrollActivity`], and redeems prepared rows
//! with [`ListPrefetcher::take_row`]. While the list is moving the prefetcher
//! is registered with the [`GapWorker`](gapwork_core::GapWorker), which runs
//! its row tasks in idle frame time.

pub mod activity;
pub mod constraints;
pub mod list_prefetcher;
pub mod pipeline;
pub mod prefetch;
pub mod viewport;

pub use activity::{ActivityTransition, HostActivity, ScrollActivity};
pub use constraints::Constraints;
pub use list_prefetcher::{ListPrefetcher, RowCache};
pub use pipeline::{build_row, prepare_row, PreparedRow, RowPipeline};
pub use prefetch::PrefetchStrategy;
pub use viewport::{ViewportTracker, DEFAULT_ITEM_EXTENT_ESTIMATE};
