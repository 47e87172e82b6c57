//! Shared error definitions for guard primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the guard crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing guard primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided decision identifier could not be parsed.
    #[error("invalid decision id: {source}")]
    InvalidDecisionId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// Board identifier failed validation.
    #[error("invalid board id `{id}`: {reason}")]
    InvalidBoardId {
        /// The offending identifier string.
        id: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Persona definition failed validation.
    #[error("invalid persona: {reason}")]
    InvalidPersona {
        /// Human-readable reason for rejection.
        reason: String,
    },
}
