//! Product catalogue
//!
//! A deliberately slow repository standing in for a database, used as the
//! loader behind the `products` region.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::key::CacheKey;
use crate::orchestrator::Loader;

/// A catalogue entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub price: f64,
}

impl Product {
    /// Cache key under which the product is stored.
    pub fn cache_key(id: u64) -> CacheKey {
        CacheKey::new().part(id)
    }
}

/// Slow product source. Every query sleeps for `latency`.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    latency: Duration,
    queries: Arc<AtomicU64>,
}

impl ProductRepository {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            queries: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of queries served so far, shared by all clones.
    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    /// Fetches a product by id.
    pub async fn find(&self, id: u64) -> Product {
        self.queries.fetch_add(1, Ordering::SeqCst);
        info!(id, "Querying product source");
        tokio::time::sleep(self.latency).await;

        Product {
            id,
            name: format!("Product-{id}"),
            price: id as f64 * 100.0,
        }
    }
}

#[async_trait]
impl Loader<Product> for ProductRepository {
    async fn load(&self, key: &str) -> anyhow::Result<Product> {
        let id = key
            .parse::<u64>()
            .with_context(|| format!("invalid product key {key:?}"))?;
        Ok(self.find(id).await)
    }
}
