//! Caching layer.
//!
//! One [`RecordCache`] per record kind, each fronting that kind's store.

pub mod record;

pub use record::{CacheStats, RecordCache};
