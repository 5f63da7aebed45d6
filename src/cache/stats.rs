//! Cache Statistics Module
//!
//! Counters for the lookup chain: L1 hits, L2 hits, loads, load errors and
//! evictions. Increments are lock-free so they can be bumped from any task.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Live counters shared by a cache region.
#[derive(Debug, Default)]
pub struct CacheStats {
    l1_hits: AtomicU64,
    l2_hits: AtomicU64,
    loads: AtomicU64,
    load_errors: AtomicU64,
    coalesced: AtomicU64,
    evictions: AtomicU64,
    remote_errors: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`], ready for a metrics collector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Lookups answered by the local store
    pub l1_hits: u64,
    /// Lookups answered by the shared store
    pub l2_hits: u64,
    /// Loader invocations (misses on both tiers)
    pub loads: u64,
    /// Loader invocations that failed
    pub load_errors: u64,
    /// Callers that joined a load already in flight
    pub coalesced: u64,
    /// Local entries displaced by capacity pressure
    pub evictions: u64,
    /// Failed shared-store operations
    pub remote_errors: u64,
    /// Capture time (RFC 3339)
    pub taken_at: String,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_l1_hit(&self) {
        self.l1_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_l2_hit(&self) {
        self.l2_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_error(&self) {
        self.load_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: u64) {
        if count > 0 {
            self.evictions.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn record_remote_error(&self) {
        self.remote_errors.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Copies the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            l1_hits: self.l1_hits.load(Ordering::Relaxed),
            l2_hits: self.l2_hits.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            load_errors: self.load_errors.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            remote_errors: self.remote_errors.load(Ordering::Relaxed),
            taken_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl StatsSnapshot {
    // == Hit Rate ==
    /// Share of lookups answered by either tier.
    ///
    /// Returns 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.l1_hits + self.l2_hits;
        let total = hits + self.loads;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}
