//! In-memory shared store
//!
//! A map shared by every clone of the handle, standing in for an external
//! cache visible to several processes. The availability switch lets callers
//! simulate an outage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::RemoteError;
use crate::remote::RemoteStore;

#[derive(Debug)]
struct StoredPayload {
    bytes: Vec<u8>,
    expires_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct Backend {
    entries: RwLock<HashMap<String, StoredPayload>>,
    unavailable: AtomicBool,
    operations: AtomicU64,
}

/// Handle to a shared in-memory store, scoped to one key namespace.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemoteStore {
    backend: Arc<Backend>,
    namespace: String,
}

impl MemoryRemoteStore {
    /// Creates a fresh, empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle on the same backend whose keys live under `namespace`.
    pub fn with_namespace(&self, namespace: impl Into<String>) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            namespace: namespace.into(),
        }
    }

    /// Marks the backend reachable or unreachable for every handle.
    pub fn set_available(&self, available: bool) {
        self.backend.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of operations attempted against the backend.
    pub fn operations(&self) -> u64 {
        self.backend.operations.load(Ordering::SeqCst)
    }

    /// Reads a live payload without counting as an operation.
    pub async fn peek(&self, key: &str) -> Option<Vec<u8>> {
        let entries = self.backend.entries.read().await;
        entries
            .get(&self.full_key(key))
            .filter(|payload| !is_expired(payload))
            .map(|payload| payload.bytes.clone())
    }

    fn full_key(&self, key: &str) -> String {
        if self.namespace.is_empty() {
            key.to_string()
        } else {
            format!("{}::{}", self.namespace, key)
        }
    }

    fn check_available(&self) -> Result<(), RemoteError> {
        self.backend.operations.fetch_add(1, Ordering::SeqCst);
        if self.backend.unavailable.load(Ordering::SeqCst) {
            Err(RemoteError::Unavailable(
                "in-memory store switched off".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

fn is_expired(payload: &StoredPayload) -> bool {
    payload
        .expires_at
        .is_some_and(|expires| Instant::now() >= expires)
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RemoteError> {
        self.check_available()?;
        let full_key = self.full_key(key);

        {
            let entries = self.backend.entries.read().await;
            match entries.get(&full_key) {
                None => return Ok(None),
                Some(payload) if !is_expired(payload) => return Ok(Some(payload.bytes.clone())),
                Some(_) => {}
            }
        }

        let mut entries = self.backend.entries.write().await;
        if entries.get(&full_key).is_some_and(is_expired) {
            entries.remove(&full_key);
            debug!(key = %full_key, "Dropped expired shared entry");
        }
        Ok(None)
    }

    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), RemoteError> {
        self.check_available()?;
        let payload = StoredPayload {
            bytes: value,
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        };
        self.backend
            .entries
            .write()
            .await
            .insert(self.full_key(key), payload);
        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<(), RemoteError> {
        self.check_available()?;
        self.backend
            .entries
            .write()
            .await
            .remove(&self.full_key(key));
        Ok(())
    }

    async fn clear(&self) -> Result<(), RemoteError> {
        self.check_available()?;
        let mut entries = self.backend.entries.write().await;
        if self.namespace.is_empty() {
            entries.clear();
        } else {
            let prefix = format!("{}::", self.namespace);
            entries.retain(|key, _| !key.starts_with(&prefix));
        }
        Ok(())
    }
}
