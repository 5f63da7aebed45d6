//! Tiered Cache demo - a slow product catalogue behind a two-level cache
//!
//! Shows concurrent lookups collapsing into one query, a cached re-read, and
//! an explicit eviction forcing a reload.

use std::env;
use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiered_cache::models::{Product, ProductRepository};
use tiered_cache::{remote, spawn_cleanup_task, RegionConfig, TieredCache};

/// Number of callers asking for the same product at once.
const CONCURRENT_CALLERS: u64 = 5;

/// Main entry point for the demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load region configuration from environment variables
/// 3. Build the cache region, with a shared tier if enabled
/// 4. Start background TTL cleanup task
/// 5. Run the product lookups
/// 6. Wait for SIGINT/SIGTERM, then stop the cleanup task
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiered_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tiered cache demo");

    let mut config = RegionConfig::from_env();
    if env::var("CACHE_REGION").is_err() {
        config.name = "products".to_string();
    }
    info!(
        "Configuration loaded: region={}, capacity={}, default_ttl={:?}, remote={}, cleanup_interval={:?}",
        config.name, config.capacity, config.default_ttl, config.enable_remote, config.cleanup_interval
    );

    let latency = env::var("PRODUCT_LATENCY_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(3));
    let repository = ProductRepository::new(latency);

    let shared = remote::connect(&config)
        .await
        .context("connecting shared cache tier")?;
    let cache: TieredCache<Product> = TieredCache::builder(config.clone())
        .remote_shared(shared)
        .build();
    info!(
        region = cache.region(),
        remote = cache.has_remote(),
        default_ttl = ?cache.default_ttl(),
        "Cache region built"
    );

    let cleanup_handle = spawn_cleanup_task(cache.clone(), config.cleanup_interval);
    info!("Background cleanup task started");

    run_demo(&cache, &repository).await?;

    info!("Demo finished, press Ctrl+C to exit");
    shutdown_signal().await?;

    cleanup_handle.abort();
    warn!("Cleanup task aborted");
    info!("Shutdown complete");
    Ok(())
}

async fn run_demo(cache: &TieredCache<Product>, repository: &ProductRepository) -> anyhow::Result<()> {
    let key = Product::cache_key(1);

    // Staggered callers for one uncached product share a single query
    let started = Instant::now();
    let mut callers = Vec::new();
    for caller in 0..CONCURRENT_CALLERS {
        let cache = cache.clone();
        let repository = repository.clone();
        let key = key.clone();
        callers.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10 * caller)).await;
            cache.get_or_load(key.as_str(), repository).await
        }));
    }
    for handle in callers {
        let product = handle.await.context("lookup task panicked")??;
        info!(?product, elapsed = ?started.elapsed(), "Concurrent lookup finished");
    }
    info!(queries = repository.queries(), "Source queries after concurrent lookups");

    let started = Instant::now();
    let product = cache.get_or_load(key.as_str(), repository.clone()).await?;
    info!(?product, elapsed = ?started.elapsed(), "Cached lookup");

    // Deleting the product evicts it, so the next read goes back to the source
    let outcome = cache.evict(key.as_str()).await;
    if let Some(err) = outcome.remote_error() {
        warn!(error = %err, "Eviction only applied locally");
    }
    let product = cache.get_or_load(key.as_str(), repository.clone()).await?;
    info!(?product, queries = repository.queries(), "Lookup after eviction");

    let stats = serde_json::to_string(&cache.stats())?;
    info!(%stats, "Cache statistics");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("installing SIGTERM handler")?;
        tokio::select! {
            result = signal::ctrl_c() => {
                result.context("installing Ctrl+C handler")?;
                info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, initiating shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.context("installing Ctrl+C handler")?;
        info!("Received Ctrl+C, initiating shutdown...");
    }

    Ok(())
}
