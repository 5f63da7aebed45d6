//! Result of operations that touch both tiers.

use crate::error::RemoteError;

/// Outcome of a write or eviction across L1 and L2.
///
/// The local tier always succeeds; `Partial` carries the shared-store failure
/// so callers can decide whether it matters to them.
#[must_use]
#[derive(Debug, Clone)]
pub enum WriteOutcome {
    /// Every configured tier was updated
    Complete,
    /// The local tier was updated but the shared store was not
    Partial(RemoteError),
}

impl WriteOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, WriteOutcome::Complete)
    }

    /// The shared-store failure, if any.
    pub fn remote_error(&self) -> Option<&RemoteError> {
        match self {
            WriteOutcome::Complete => None,
            WriteOutcome::Partial(err) => Some(err),
        }
    }
}

impl From<Result<(), RemoteError>> for WriteOutcome {
    fn from(result: Result<(), RemoteError>) -> Self {
        match result {
            Ok(()) => WriteOutcome::Complete,
            Err(err) => WriteOutcome::Partial(err),
        }
    }
}
