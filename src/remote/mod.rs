//! Remote Store Module
//!
//! The shared (L2) tier is reached through the [`RemoteStore`] capability.
//! Adapters move opaque bytes; encoding happens in the orchestrator.

mod memory;
#[cfg(feature = "redis")]
mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::config::RegionConfig;
use crate::error::RemoteError;

pub use memory::MemoryRemoteStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisRemoteStore;

/// Adapter to an external key/value cache shared between processes.
///
/// Implementations must report an unreachable store as
/// [`RemoteError::Unavailable`] and never as a missing key.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    /// Fetches the payload stored under `key`, `Ok(None)` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RemoteError>;

    /// Stores `value` under `key` for `ttl` (no expiry when `None`).
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
        -> Result<(), RemoteError>;

    /// Removes `key`; absent keys are not an error.
    async fn evict(&self, key: &str) -> Result<(), RemoteError>;

    /// Removes every key of the region this adapter serves.
    async fn clear(&self) -> Result<(), RemoteError>;
}

/// Builds the shared tier described by `config`, if any.
///
/// With the `redis` feature and a `remote_url`, connects to Redis. Otherwise
/// an enabled remote tier falls back to a process-local in-memory store.
pub async fn connect(config: &RegionConfig) -> anyhow::Result<Option<Arc<dyn RemoteStore>>> {
    if !config.enable_remote {
        return Ok(None);
    }

    if let Some(store) = connect_redis(config).await? {
        return Ok(Some(store));
    }

    info!(region = %config.name, "Using in-memory shared store");
    Ok(Some(Arc::new(
        MemoryRemoteStore::new().with_namespace(config.name.clone()),
    )))
}

#[cfg(feature = "redis")]
async fn connect_redis(config: &RegionConfig) -> anyhow::Result<Option<Arc<dyn RemoteStore>>> {
    let Some(url) = &config.remote_url else {
        return Ok(None);
    };
    let store = RedisRemoteStore::connect(url, config.name.clone()).await?;
    Ok(Some(Arc::new(store)))
}

#[cfg(not(feature = "redis"))]
async fn connect_redis(config: &RegionConfig) -> anyhow::Result<Option<Arc<dyn RemoteStore>>> {
    if config.remote_url.is_some() {
        tracing::warn!(
            region = %config.name,
            "Remote URL set but redis support is not compiled in"
        );
    }
    Ok(None)
}
