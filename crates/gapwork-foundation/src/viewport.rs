//! Viewport state a list reports to its prefetcher.

use std::ops::Range;

use gapwork_core::ViewportSnapshot;

/// Item extent assumed before any row has been measured.
pub const DEFAULT_ITEM_EXTENT_ESTIMATE: f32 = 48.0;

/// Accumulates visible range, scroll direction and measured row extents.
#[derive(Clone, Debug)]
pub struct ViewportTracker {
    visible: Range<usize>,
    total_count: usize,
    scroll_direction: f32,
    average_item_extent: f32,
    measured_items: u64,
}

impl Default for ViewportTracker {
    fn default() -> Self {
        Self {
            visible: 0..0,
            total_count: 0,
            scroll_direction: 0.0,
            average_item_extent: DEFAULT_ITEM_EXTENT_ESTIMATE,
            measured_items: 0,
        }
    }
}

impl ViewportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the visible range; it is clamped to `total_count`.
    pub fn set_visible(&mut self, visible: Range<usize>, total_count: usize) {
        let start = visible.start.min(total_count);
        let end = visible.end.clamp(start, total_count);
        self.visible = start..end;
        self.total_count = total_count;
    }

    /// Records a scroll delta. Only its sign is kept; zero means idle.
    pub fn record_scroll_delta(&mut self, delta: f32) {
        self.scroll_direction = if delta > 0.0 {
            1.0
        } else if delta < 0.0 {
            -1.0
        } else {
            0.0
        };
    }

    /// Folds a measured row extent into the running average.
    ///
    /// Non-finite and negative extents are ignored.
    pub fn record_item_extent(&mut self, extent: f32) {
        if !extent.is_finite() || extent < 0.0 {
            log::debug!("viewport: ignoring item extent {extent}");
            return;
        }
        self.measured_items += 1;
        let n = self.measured_items as f32;
        self.average_item_extent = self.average_item_extent * ((n - 1.0) / n) + extent / n;
    }

    pub fn visible(&self) -> Range<usize> {
        self.visible.clone()
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn scroll_direction(&self) -> f32 {
        self.scroll_direction
    }

    pub fn average_item_extent(&self) -> f32 {
        self.average_item_extent
    }

    pub fn snapshot(&self) -> ViewportSnapshot {
        ViewportSnapshot {
            visible: self.visible.clone(),
            total_count: self.total_count,
            scroll_direction: self.scroll_direction,
            average_item_extent: self.average_item_extent,
        }
    }
}
