//! Tiered Cache - A two-level read-through cache
//!
//! A bounded local store with TTL expiration and LRU eviction (L1), an
//! optional shared store behind an adapter (L2), and an orchestrator that
//! loads each missing key once no matter how many callers ask for it.

pub mod cache;
pub mod config;
pub mod error;
pub mod key;
pub mod models;
pub mod orchestrator;
pub mod remote;
pub mod tasks;

pub use config::RegionConfig;
pub use error::{CacheError, LoadError, RemoteError};
pub use key::CacheKey;
pub use orchestrator::{CacheValue, Loader, TieredCache, WriteOutcome};
pub use tasks::spawn_cleanup_task;
