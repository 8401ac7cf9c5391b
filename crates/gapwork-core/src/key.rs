//! Identifiers shared across the scheduler.

use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_HOST_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a host (a scrollable list) known to the scheduler.
///
/// Ids are never reused within a process. The id says nothing about whether
/// the host is still alive; liveness is tracked through weak references.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(u64);

impl HostId {
    /// Allocates a fresh id.
    pub fn next() -> Self {
        Self(NEXT_HOST_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host#{}", self.0)
    }
}

/// Opaque task identifier, usually the item position it prefetches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl From<usize> for TaskId {
    fn from(position: usize) -> Self {
        Self(position as u64)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Template identifier.
///
/// Keys cost samples in the [`CostEstimator`](crate::CostEstimator) and
/// namespaces entries in the [`PrefetchCache`](crate::PrefetchCache).
/// Cloning is a reference-count bump.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateKey(Arc<str>);

impl TemplateKey {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TemplateKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TemplateKey {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl Borrow<str> for TemplateKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TemplateKey({:?})", &*self.0)
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
