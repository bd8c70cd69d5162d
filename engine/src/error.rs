//! Error types for the Bough engine.

use crate::{Guid, SessionState};
use thiserror::Error;

/// All possible errors from the Bough engine.
///
/// Problems with a single incoming record are not errors; they surface as
/// [`crate::ProcessOutcome::Skipped`]. These variants are reserved for
/// failures of the store, the session lifecycle, or the finalization task.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Store errors
    #[error("store error: {0}")]
    Store(String),

    #[error("folder not indexed: {0}")]
    FolderNotIndexed(Guid),

    #[error("parent not found: {0}")]
    ParentNotFound(Guid),

    // Session errors
    #[error("invalid session state: expected {expected}, got {actual}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },

    #[error("session begin failed: {0}")]
    BeginFailed(String),

    #[error("finalization task failed: {0}")]
    FinalizeTask(String),

    // Persistence errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::FolderNotIndexed("unfiled".into());
        assert_eq!(err.to_string(), "folder not indexed: unfiled");

        let err = Error::InvalidState {
            expected: SessionState::Processing,
            actual: SessionState::Begin,
        };
        assert_eq!(
            err.to_string(),
            "invalid session state: expected processing, got begin"
        );

        let err = Error::BeginFailed("store error: disk full".into());
        assert_eq!(
            err.to_string(),
            "session begin failed: store error: disk full"
        );
    }
}
