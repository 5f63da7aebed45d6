//! Loader capability
//!
//! The authoritative source behind a cache region. Any async closure taking
//! the key as a `String` is a loader.

use std::future::Future;

use async_trait::async_trait;

/// Produces the authoritative value for a key, e.g. with a database query.
///
/// Loads run on a spawned task so that waiters giving up never cancel the
/// work for the others; hence the `'static` bound.
#[async_trait]
pub trait Loader<V: Send + 'static>: Send + Sync + 'static {
    async fn load(&self, key: &str) -> anyhow::Result<V>;
}

#[async_trait]
impl<V, F, Fut> Loader<V> for F
where
    V: Send + 'static,
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
{
    async fn load(&self, key: &str) -> anyhow::Result<V> {
        (self)(key.to_string()).await
    }
}
