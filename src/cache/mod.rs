//! Cache Module
//!
//! The local (L1) tier: in-memory storage with TTL expiration, LRU eviction
//! and the counters shared by a cache region.

mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use stats::{CacheStats, StatsSnapshot};
pub use store::EntryStore;
