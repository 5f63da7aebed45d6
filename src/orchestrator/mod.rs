//! Cache Orchestrator Module
//!
//! Composes the local store and the optional shared store into one
//! read-through cache. Lookups go L1, then L2, then the loader; concurrent
//! misses on one key share a single load.

mod flight;
mod loader;
mod outcome;

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, EntryStore, StatsSnapshot};
use crate::config::RegionConfig;
use crate::error::{CacheError, LoadError, RemoteError, Result};
use crate::remote::RemoteStore;

use flight::{FlightGuard, FlightTable, Joined};

pub use loader::Loader;
pub use outcome::WriteOutcome;

/// Values a region can hold: cloned out of L1, encoded as JSON for L2.
pub trait CacheValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

struct Inner<V> {
    region: String,
    default_ttl: Duration,
    local: EntryStore<V>,
    remote: Option<Arc<dyn RemoteStore>>,
    flights: FlightTable<V>,
    stats: CacheStats,
}

// == Tiered Cache ==
/// One cache region. Cloning is cheap and every clone shares the same state.
pub struct TieredCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for TieredCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Builder selecting the tiers of a region at construction time.
pub struct TieredCacheBuilder<V> {
    config: RegionConfig,
    remote: Option<Arc<dyn RemoteStore>>,
    _value: PhantomData<fn() -> V>,
}

impl<V: CacheValue> TieredCacheBuilder<V> {
    /// Uses `store` as the shared tier.
    pub fn remote(mut self, store: impl RemoteStore) -> Self {
        self.remote = Some(Arc::new(store));
        self
    }

    /// Uses an already shared adapter as the shared tier, if any.
    pub fn remote_shared(mut self, store: Option<Arc<dyn RemoteStore>>) -> Self {
        self.remote = store;
        self
    }

    pub fn build(self) -> TieredCache<V> {
        if let Some(remote) = &self.remote {
            info!(
                region = %self.config.name,
                capacity = self.config.capacity,
                backend = remote.name(),
                "Cache region ready with shared tier"
            );
        } else {
            info!(
                region = %self.config.name,
                capacity = self.config.capacity,
                "Cache region ready (local only)"
            );
        }

        TieredCache {
            inner: Arc::new(Inner {
                region: self.config.name,
                default_ttl: self.config.default_ttl,
                local: EntryStore::new(self.config.capacity),
                remote: self.remote,
                flights: FlightTable::default(),
                stats: CacheStats::new(),
            }),
        }
    }
}

impl<V: CacheValue> TieredCache<V> {
    /// Starts configuring a region.
    pub fn builder(config: RegionConfig) -> TieredCacheBuilder<V> {
        TieredCacheBuilder {
            config,
            remote: None,
            _value: PhantomData,
        }
    }

    // == Constructor ==
    /// Creates a local-only region.
    pub fn new(config: RegionConfig) -> Self {
        TieredCache::builder(config).build()
    }

    // == Get Or Load ==
    /// Returns the cached value for `key`, loading it with the region's
    /// default TTL on a miss.
    pub async fn get_or_load<L: Loader<V>>(&self, key: &str, loader: L) -> Result<V> {
        self.get_or_load_with_ttl(key, self.inner.default_ttl, loader)
            .await
    }

    /// Returns the cached value for `key`, loading it on a miss.
    ///
    /// Among all concurrent callers for the same key at most one runs the
    /// loader; the rest receive its value or its failure. Failures are not
    /// cached and not retried.
    pub async fn get_or_load_with_ttl<L: Loader<V>>(
        &self,
        key: &str,
        ttl: Duration,
        loader: L,
    ) -> Result<V> {
        if let Some(value) = self.lookup(key, ttl).await {
            return Ok(value);
        }

        let inner = &self.inner;
        let rx = match inner.flights.join(key, || inner.local.get(key)) {
            Joined::Ready(value) => {
                inner.stats.record_l1_hit();
                return Ok(value);
            }
            Joined::Follower(rx) => {
                inner.stats.record_coalesced();
                debug!(region = %inner.region, key, "Joined in-flight load");
                rx
            }
            Joined::Leader(guard, rx) => {
                let inner = Arc::clone(inner);
                let key = key.to_string();
                tokio::spawn(async move { inner.run_load(key, ttl, loader, guard).await });
                rx
            }
        };

        flight::wait(key, rx).await
    }

    /// Like [`TieredCache::get_or_load`], but gives up after `timeout`.
    pub async fn get_or_load_timeout<L: Loader<V>>(
        &self,
        key: &str,
        timeout: Duration,
        loader: L,
    ) -> Result<V> {
        self.get_or_load_with_ttl_timeout(key, self.inner.default_ttl, timeout, loader)
            .await
    }

    /// Like [`TieredCache::get_or_load_with_ttl`], but gives up after `timeout`.
    ///
    /// Giving up only affects this caller: the load keeps running and still
    /// populates the cache, with `ttl`, for everyone else.
    pub async fn get_or_load_with_ttl_timeout<L: Loader<V>>(
        &self,
        key: &str,
        ttl: Duration,
        timeout: Duration,
        loader: L,
    ) -> Result<V> {
        match tokio::time::timeout(timeout, self.get_or_load_with_ttl(key, ttl, loader)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(region = %self.inner.region, key, "Caller stopped waiting for load");
                Err(CacheError::Cancelled(key.to_string()))
            }
        }
    }

    // == Get ==
    /// Looks `key` up in L1, then L2, without loading.
    ///
    /// An L2 hit is written back to L1 with the region default TTL. An
    /// unreachable or corrupt L2 entry is reported as a miss.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.lookup(key, self.inner.default_ttl).await
    }

    /// L1, then L2; an L2 hit is written back to L1 for `ttl`.
    async fn lookup(&self, key: &str, ttl: Duration) -> Option<V> {
        let inner = &self.inner;

        if let Some(value) = inner.local.get(key) {
            inner.stats.record_l1_hit();
            debug!(region = %inner.region, key, "L1 hit");
            return Some(value);
        }

        let remote = inner.remote.as_ref()?;
        match remote.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<V>(&bytes) {
                Ok(value) => {
                    inner.stats.record_l2_hit();
                    debug!(region = %inner.region, key, "L2 hit");
                    let evicted = inner.local.put(key, value.clone(), Some(ttl));
                    inner.stats.record_evictions(evicted);
                    Some(value)
                }
                Err(err) => {
                    inner.stats.record_remote_error();
                    warn!(region = %inner.region, key, error = %err, "Undecodable L2 payload, treating as miss");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                inner.stats.record_remote_error();
                warn!(region = %inner.region, key, error = %err, "L2 read failed, falling back to loader");
                None
            }
        }
    }

    // == Put ==
    /// Writes `value` through both tiers with the default TTL.
    pub async fn put(&self, key: &str, value: V) -> WriteOutcome {
        self.put_with_ttl(key, value, self.inner.default_ttl).await
    }

    /// Writes `value` to L1, then L2, bypassing the loader.
    pub async fn put_with_ttl(&self, key: &str, value: V, ttl: Duration) -> WriteOutcome {
        self.inner.write_through(key, value, ttl).await
    }

    // == Evict ==
    /// Removes `key` from L1, then L2. L1 removal is never rolled back.
    pub async fn evict(&self, key: &str) -> WriteOutcome {
        let inner = &self.inner;
        let removed = inner.local.evict(key);
        debug!(region = %inner.region, key, removed, "Evicted from L1");

        let Some(remote) = &inner.remote else {
            return WriteOutcome::Complete;
        };
        inner.report(remote.evict(key).await, "evict", key)
    }

    /// Clears the whole region from L1, then L2.
    pub async fn evict_all(&self) -> WriteOutcome {
        let inner = &self.inner;
        inner.local.clear();
        info!(region = %inner.region, "Cleared L1");

        let Some(remote) = &inner.remote else {
            return WriteOutcome::Complete;
        };
        inner.report(remote.clear().await, "clear", "*")
    }

    // == Maintenance ==
    /// Drops expired L1 entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.inner.local.cleanup_expired()
    }

    /// The local tier, for inspection.
    pub fn local(&self) -> &EntryStore<V> {
        &self.inner.local
    }

    /// Current counter values.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn region(&self) -> &str {
        &self.inner.region
    }

    pub fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }

    pub fn has_remote(&self) -> bool {
        self.inner.remote.is_some()
    }

    /// Number of loads currently running.
    pub fn in_flight(&self) -> usize {
        self.inner.flights.len()
    }
}

impl<V: CacheValue> Inner<V> {
    async fn run_load<L: Loader<V>>(
        self: Arc<Self>,
        key: String,
        ttl: Duration,
        loader: L,
        flight: FlightGuard<V>,
    ) {
        self.stats.record_load();
        debug!(region = %self.region, key = %key, "Miss on both tiers, loading");

        let result = match loader.load(&key).await {
            Ok(value) => {
                let outcome = self.write_through(&key, value.clone(), ttl).await;
                if let WriteOutcome::Partial(err) = outcome {
                    debug!(region = %self.region, key = %key, error = %err, "Loaded value kept in L1 only");
                }
                Ok(value)
            }
            Err(err) => {
                self.stats.record_load_error();
                warn!(region = %self.region, key = %key, error = %err, "Load failed");
                Err(LoadError::new(err))
            }
        };

        flight.complete(result);
    }

    async fn write_through(&self, key: &str, value: V, ttl: Duration) -> WriteOutcome {
        let Some(remote) = &self.remote else {
            let evicted = self.local.put(key, value, Some(ttl));
            self.stats.record_evictions(evicted);
            return WriteOutcome::Complete;
        };

        let encoded = serde_json::to_vec(&value).map_err(RemoteError::from);
        let evicted = self.local.put(key, value, Some(ttl));
        self.stats.record_evictions(evicted);

        let result = match encoded {
            Ok(bytes) => remote.put(key, bytes, Some(ttl)).await,
            Err(err) => Err(err),
        };
        self.report(result, "put", key)
    }

    fn report(&self, result: std::result::Result<(), RemoteError>, op: &str, key: &str) -> WriteOutcome {
        if let Err(err) = &result {
            self.stats.record_remote_error();
            warn!(region = %self.region, key, op, error = %err, "L2 operation failed");
        }
        WriteOutcome::from(result)
    }
}
