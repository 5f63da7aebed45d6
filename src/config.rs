//! Configuration Module
//!
//! Handles loading and managing cache region configuration from environment variables.

use std::env;
use std::time::Duration;

/// Configuration of one cache region.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct RegionConfig {
    /// Region name, used as the key namespace in the shared store
    pub name: String,
    /// Maximum total weight held by the local store (one per entry by default)
    pub capacity: u64,
    /// TTL applied when a caller does not supply one
    pub default_ttl: Duration,
    /// Whether the shared L2 store is used
    pub enable_remote: bool,
    /// Connection URL of the shared store, owned by its adapter
    pub remote_url: Option<String>,
    /// Interval between background sweeps of expired local entries
    pub cleanup_interval: Duration,
}

impl RegionConfig {
    /// Creates a config for `name` with default limits.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates a new RegionConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_REGION` - Region name (default: "default")
    /// - `CACHE_CAPACITY` - Local store capacity (default: 1000)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CACHE_ENABLE_REMOTE` - Use the shared store (default: false)
    /// - `CACHE_REMOTE_URL` - Shared store URL (default: unset)
    /// - `CACHE_CLEANUP_INTERVAL_MS` - Sweep frequency in milliseconds (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            name: env::var("CACHE_REGION").unwrap_or(defaults.name),
            capacity: parse_var("CACHE_CAPACITY").unwrap_or(defaults.capacity),
            default_ttl: parse_var("CACHE_DEFAULT_TTL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.default_ttl),
            enable_remote: env::var("CACHE_ENABLE_REMOTE")
                .ok()
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.enable_remote),
            remote_url: env::var("CACHE_REMOTE_URL").ok().filter(|v| !v.is_empty()),
            cleanup_interval: parse_var("CACHE_CLEANUP_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.cleanup_interval),
        }
    }

    /// Sets the local capacity.
    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the default TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            capacity: 1000,
            default_ttl: Duration::from_secs(300),
            enable_remote: false,
            remote_url: None,
            cleanup_interval: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = RegionConfig::default();
        assert_eq!(config.name, "default");
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.default_ttl, Duration::from_secs(300));
        assert!(!config.enable_remote);
        assert!(config.remote_url.is_none());
        assert_eq!(config.cleanup_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_REGION");
        env::remove_var("CACHE_CAPACITY");
        env::remove_var("CACHE_DEFAULT_TTL_MS");
        env::remove_var("CACHE_ENABLE_REMOTE");
        env::remove_var("CACHE_REMOTE_URL");
        env::remove_var("CACHE_CLEANUP_INTERVAL_MS");

        let config = RegionConfig::from_env();
        assert_eq!(config.name, "default");
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.default_ttl, Duration::from_secs(300));
        assert!(!config.enable_remote);
        assert_eq!(config.cleanup_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_config_builders() {
        let config = RegionConfig::named("products")
            .with_capacity(2)
            .with_default_ttl(Duration::from_millis(50));

        assert_eq!(config.name, "products");
        assert_eq!(config.capacity, 2);
        assert_eq!(config.default_ttl, Duration::from_millis(50));
    }
}
