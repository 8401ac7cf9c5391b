//! Scroll-direction aware collection of prefetch candidates.
//!
//! Candidates are the `K` items just past the visible edge in the direction
//! of travel. Each carries a distance from that edge, which becomes the task
//! priority: the item about to scroll in has the smallest distance.

use std::ops::Range;

use crate::collections::map::HashMap;

/// A candidate position and its distance from the visible edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrefetchPositionInfo {
    pub position: usize,
    /// Non-negative distance in layout units.
    pub distance: f32,
}

/// What a host knows about its viewport at collection time.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewportSnapshot {
    /// Visible item range `[lo, hi)`.
    pub visible: Range<usize>,
    /// Total number of items in the list.
    pub total_count: usize,
    /// Signed scroll direction: positive = forward, negative = backward,
    /// zero = idle.
    pub scroll_direction: f32,
    /// Average main-axis extent of an item.
    pub average_item_extent: f32,
}

impl ViewportSnapshot {
    /// Returns the candidate range for a buffer of `buffer_count` items.
    ///
    /// Empty when idle or when the visible edge already touches the list end.
    pub fn candidate_range(&self, buffer_count: usize) -> Range<usize> {
        let lo = self.visible.start.min(self.total_count);
        let hi = self.visible.end.max(lo).min(self.total_count);
        if self.scroll_direction > 0.0 {
            hi..hi.saturating_add(buffer_count).min(self.total_count)
        } else if self.scroll_direction < 0.0 {
            lo.saturating_sub(buffer_count)..lo
        } else {
            0..0
        }
    }
}

/// Registry of prefetch candidates for one host.
///
/// Positions are keyed by index. Adding a position twice keeps the smaller
/// distance.
#[derive(Clone, Debug, Default)]
pub struct PositionCollector {
    positions: HashMap<usize, f32>,
}

impl PositionCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `position` at `distance`, keeping the minimum on repeats.
    ///
    /// Negative and NaN distances are treated as zero.
    pub fn add_position(&mut self, position: usize, distance: f32) {
        let distance = if distance > 0.0 { distance } else { 0.0 };
        self.positions
            .entry(position)
            .and_modify(|existing| {
                if distance < *existing {
                    *existing = distance;
                }
            })
            .or_insert(distance);
    }

    /// Collects candidates for `viewport` and returns how many were added.
    ///
    /// Previously collected positions are kept; callers recomputing from
    /// scratch should [`clear`](Self::clear) first. Nothing is collected while
    /// the viewport is idle.
    pub fn collect(&mut self, viewport: &ViewportSnapshot, buffer_count: usize) -> usize {
        let extent = if viewport.average_item_extent.is_finite() {
            viewport.average_item_extent.max(0.0)
        } else {
            0.0
        };
        let candidates = viewport.candidate_range(buffer_count);
        let count = candidates.len();

        if viewport.scroll_direction > 0.0 {
            let edge = candidates.start;
            for position in candidates {
                self.add_position(position, (position - edge + 1) as f32 * extent);
            }
        } else if viewport.scroll_direction < 0.0 {
            let edge = candidates.end;
            for position in candidates {
                self.add_position(position, (edge - position) as f32 * extent);
            }
        }
        count
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn distance(&self, position: usize) -> Option<f32> {
        self.positions.get(&position).copied()
    }

    /// Returns all candidates, nearest first (ties by position).
    pub fn positions(&self) -> Vec<PrefetchPositionInfo> {
        let mut infos: Vec<_> = self
            .positions
            .iter()
            .map(|(&position, &distance)| PrefetchPositionInfo { position, distance })
            .collect();
        infos.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.position.cmp(&b.position))
        });
        infos
    }
}
