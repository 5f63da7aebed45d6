//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Insertion time, reset when the entry is refreshed
    pub inserted_at: Instant,
    /// Expiration time, None = no expiration
    pub expires_at: Option<Instant>,
    /// Capacity cost of the entry
    pub weight: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL and a weight of one.
    pub fn new(value: V, ttl: Option<Duration>) -> Self {
        Self::weighted(value, ttl, 1)
    }

    /// Creates a new cache entry with an explicit weight.
    pub fn weighted(value: V, ttl: Option<Duration>, weight: u64) -> Self {
        let now = Instant::now();
        Self {
            value,
            inserted_at: now,
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
            weight,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches `expires_at`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Checks expiry against a given instant.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }
}
