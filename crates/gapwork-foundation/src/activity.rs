//! Scroll activity of a list host.

/// What a list is currently doing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScrollActivity {
    #[default]
    Idle,
    /// The user's finger is on the list.
    Dragging,
    /// Coasting after a drag was released.
    Fling,
    /// Programmatic scroll (e.g. `scroll_to_item` with animation).
    Animating,
}

impl ScrollActivity {
    /// Prefetching only makes sense while content is moving.
    pub fn is_prefetch_active(self) -> bool {
        !matches!(self, ScrollActivity::Idle)
    }
}

/// Effect of an activity change on the host's scheduler registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityTransition {
    /// Prefetch became active: register the collector.
    Activated,
    /// Prefetch became inactive: unregister the collector.
    Deactivated,
    /// No change in registration, including moves between active states.
    Unchanged,
}

/// Tracks a host's [`ScrollActivity`] and reports registration edges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostActivity {
    state: ScrollActivity,
}

impl HostActivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ScrollActivity {
        self.state
    }

    pub fn is_prefetch_active(&self) -> bool {
        self.state.is_prefetch_active()
    }

    /// Moves to `next` and reports whether prefetch was switched on or off.
    pub fn transition(&mut self, next: ScrollActivity) -> ActivityTransition {
        let was_active = self.state.is_prefetch_active();
        self.state = next;
        match (was_active, next.is_prefetch_active()) {
            (false, true) => ActivityTransition::Activated,
            (true, false) => ActivityTransition::Deactivated,
            _ => ActivityTransition::Unchanged,
        }
    }
}
