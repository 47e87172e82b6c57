//! Error types for the artifact store.

use serde_json::Error as SerdeError;
use thiserror::Error;

use crate::record::ArtifactKind;

/// Errors emitted by artifact stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure while reading or writing the journal file.
    #[error("i/o error: {source}")]
    Io {
        /// Source [`std::io::Error`].
        #[from]
        source: std::io::Error,
    },
    /// Serialization or deserialization error.
    #[error("serialization error: {source}")]
    Serialization {
        /// Source [`serde_json::Error`].
        #[from]
        source: SerdeError,
    },
    /// An artifact with the same lookup key already exists on the board.
    #[error("{kind} artifact with key `{key}` already exists on board `{board_id}`")]
    Conflict {
        /// Board holding the existing artifact.
        board_id: String,
        /// Kind of the existing artifact.
        kind: ArtifactKind,
        /// Lookup key that collided.
        key: String,
    },
    /// Artifact record failed validation.
    #[error("invalid artifact record: {0}")]
    InvalidRecord(&'static str),
    /// Store backend reported an application error.
    #[error("artifact store backend error: {reason}")]
    Backend {
        /// Human-readable reason describing the failure.
        reason: String,
    },
}

impl StoreError {
    /// Helper to construct backend errors from string-like values.
    #[must_use]
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }

    /// Returns true when the error reports a lookup-key collision.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
