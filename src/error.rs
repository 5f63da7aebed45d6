//! Error types for the tiered cache
//!
//! Provides unified error handling using thiserror.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

// == Remote Error Enum ==
/// Failure reported by an L2 adapter.
///
/// A missing key is never an error; adapters return `Ok(None)` for it.
#[derive(Error, Debug, Clone)]
pub enum RemoteError {
    /// The shared store could not be reached
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// A value could not be encoded for, or decoded from, the shared store
    #[error("Remote payload codec failure: {0}")]
    Codec(String),
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Codec(err.to_string())
    }
}

// == Load Error ==
/// Failure produced by a loader.
///
/// Cloning shares the underlying error, so every waiter of one in-flight load
/// observes the very same failure.
#[derive(Clone)]
pub struct LoadError(Arc<anyhow::Error>);

impl LoadError {
    /// Wraps a loader failure.
    pub fn new(err: anyhow::Error) -> Self {
        Self(Arc::new(err))
    }

    /// Returns the wrapped error.
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }

    /// Returns true if both handles point at the same failure.
    pub fn same_failure(&self, other: &LoadError) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoadError({:?})", self.0)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl std::error::Error for LoadError {}

// == Cache Error Enum ==
/// Caller-facing error of the cache orchestrator.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// The loader failed; shared by every waiter of the same load
    #[error("Load failed: {0}")]
    Load(#[from] LoadError),

    /// The caller stopped waiting before the load finished
    #[error("Gave up waiting for key: {0}")]
    Cancelled(String),

    /// The load task ended without producing a result
    #[error("Load aborted for key: {0}")]
    LoadAborted(String),
}

// == Result Type Alias ==
/// Convenience Result type for the tiered cache.
pub type Result<T> = std::result::Result<T, CacheError>;
