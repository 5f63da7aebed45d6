//! TTL Cleanup Task
//!
//! Background task that periodically removes expired local entries, so that
//! entries nobody reads again do not hold capacity until LRU displaces them.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::orchestrator::{CacheValue, TieredCache};

/// Spawns a background task that periodically sweeps expired L1 entries.
///
/// The shared tier expires entries on its own and is not touched.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache: TieredCache<Product> = TieredCache::new(RegionConfig::named("products"));
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<V: CacheValue>(cache: TieredCache<V>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            region = cache.region(),
            "Starting TTL cleanup task with interval of {:?}", interval
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.purge_expired();
            if removed > 0 {
                info!(region = cache.region(), "TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!(region = cache.region(), "TTL cleanup: no expired entries found");
            }
        }
    })
}
