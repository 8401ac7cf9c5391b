//! Hash map used by the estimator, cache and collector.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::HashMap;
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use rustc_hash::FxHashMap as HashMap;
}
