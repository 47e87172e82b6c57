//! Guard errors and their wire representation.

use guard_store::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors surfaced while evaluating a guard request.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Request failed schema validation.
    #[error("{0}")]
    InvalidInput(String),
    /// The persona generator could not produce a panel.
    #[error("{0}")]
    PersonaGeneration(String),
    /// A collaborator (aggregator, reputation updater) reported a failure.
    #[error("{collaborator} failed: {reason}")]
    Collaborator {
        /// Collaborator name.
        collaborator: &'static str,
        /// Human-readable explanation.
        reason: String,
    },
    /// Artifact store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A stored artifact did not have the expected shape.
    #[error("corrupt {kind} artifact: {reason}")]
    CorruptArtifact {
        /// Artifact kind label.
        kind: &'static str,
        /// What was wrong with it.
        reason: String,
    },
    /// Primitive type validation failure.
    #[error(transparent)]
    Primitive(#[from] guard_primitives::Error),
    /// JSON serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// A step panicked; the payload message is preserved.
    #[error("internal fault: {0}")]
    Panicked(String),
}

impl GuardError {
    /// Helper to construct collaborator errors.
    #[must_use]
    pub fn collaborator(collaborator: &'static str, reason: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator,
            reason: reason.into(),
        }
    }

    /// Returns the wire error code for this failure.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::PersonaGeneration(_) => ErrorCode::PersonaGenerationFailed,
            _ => ErrorCode::AgentActionGuardFailed,
        }
    }
}

/// Result alias for guard operations.
pub type GuardResult<T> = Result<T, GuardError>;

/// Error codes returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The request does not match the schema; fix it before retrying.
    InvalidInput,
    /// Panel generation failed; the request may be retried.
    PersonaGenerationFailed,
    /// Unexpected failure; fatal for this request.
    AgentActionGuardFailed,
}

/// Error payload of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Additional structured context.
    #[serde(default)]
    pub details: Map<String, Value>,
}

/// Response returned when a request fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Best-known board identifier, empty when none was supplied.
    pub board_id: String,
    /// Error payload.
    pub error: ErrorBody,
}

impl ErrorResponse {
    /// Renders `err` for the given board.
    #[must_use]
    pub fn new(board_id: impl Into<String>, err: &GuardError) -> Self {
        Self {
            board_id: board_id.into(),
            error: ErrorBody {
                code: err.code(),
                message: err.to_string(),
                details: Map::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn codes_follow_taxonomy() {
        assert_eq!(
            GuardError::InvalidInput("x".into()).code(),
            ErrorCode::InvalidInput
        );
        assert_eq!(
            GuardError::PersonaGeneration("x".into()).code(),
            ErrorCode::PersonaGenerationFailed
        );
        assert_eq!(
            GuardError::Store(StoreError::backend("disk full")).code(),
            ErrorCode::AgentActionGuardFailed
        );
    }

    #[test]
    fn error_response_shape() {
        let response = ErrorResponse::new("b1", &GuardError::InvalidInput("board_id is required".into()));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "board_id": "b1",
                "error": {"code": "INVALID_INPUT", "message": "board_id is required", "details": {}}
            })
        );
    }
}
