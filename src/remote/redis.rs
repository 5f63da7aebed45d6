//! Redis-backed shared store
//!
//! Keys are written as `<namespace>::<key>` so several regions can share one
//! Redis database. Connection loss is reported as `RemoteError::Unavailable`.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

use crate::error::RemoteError;
use crate::remote::RemoteStore;

const SCAN_BATCH: usize = 500;

/// Shared store backed by a Redis server.
#[derive(Clone)]
pub struct RedisRemoteStore {
    conn: ConnectionManager,
    namespace: String,
}

impl RedisRemoteStore {
    /// Connects to `url` and scopes every key under `namespace`.
    pub async fn connect(url: &str, namespace: impl Into<String>) -> Result<Self, RemoteError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;
        let namespace = namespace.into();
        info!(namespace = %namespace, "Connected to Redis shared store");
        Ok(Self { conn, namespace })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}::{}", self.namespace, key)
    }
}

/// PSETEX argument for `ttl`: saturates on overflow, and rounds
/// sub-millisecond TTLs up since PSETEX rejects zero.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn unavailable(err: redis::RedisError) -> RemoteError {
    RemoteError::Unavailable(err.to_string())
}

#[async_trait]
impl RemoteStore for RedisRemoteStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RemoteError> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<Vec<u8>>>(self.full_key(key))
            .await
            .map_err(unavailable)
    }

    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), RemoteError> {
        let mut conn = self.conn.clone();
        let full_key = self.full_key(key);
        match ttl {
            Some(ttl) => {
                conn.pset_ex::<_, _, ()>(full_key, value, ttl_millis(ttl))
                    .await
                    .map_err(unavailable)
            }
            None => conn
                .set::<_, _, ()>(full_key, value)
                .await
                .map_err(unavailable),
        }
    }

    async fn evict(&self, key: &str) -> Result<(), RemoteError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(self.full_key(key))
            .await
            .map_err(unavailable)
    }

    async fn clear(&self) -> Result<(), RemoteError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}::*", self.namespace);
        let mut cursor: u64 = 0;
        let mut removed = 0usize;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(unavailable)?;

            if !keys.is_empty() {
                removed += keys.len();
                conn.del::<_, ()>(keys).await.map_err(unavailable)?;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(namespace = %self.namespace, removed, "Cleared Redis namespace");
        Ok(())
    }
}
