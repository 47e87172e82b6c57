//! Artifact records persisted per board.

use std::fmt::{self, Display, Formatter};
use std::time::SystemTime;

use guard_primitives::BoardId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{StoreError, StoreResult};

/// Category of a stored artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A recorded guard decision, keyed by its idempotency key.
    Decision,
    /// A persona panel version, keyed by its panel identifier.
    PersonaSet,
}

impl ArtifactKind {
    /// Returns the wire label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Decision => "decision",
            Self::PersonaSet => "persona_set",
        }
    }
}

impl Display for ArtifactKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable reference to a written artifact, reported back in write receipts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    /// Builds the reference for an artifact identity.
    #[must_use]
    pub fn new(board_id: &BoardId, kind: ArtifactKind, artifact_id: Uuid) -> Self {
        Self(format!("{board_id}/{kind}/{artifact_id}"))
    }

    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ArtifactRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single stored artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    artifact_id: Uuid,
    board_id: BoardId,
    kind: ArtifactKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    written_at: SystemTime,
    payload: Value,
}

impl ArtifactRecord {
    /// Creates a builder for a new artifact record.
    #[must_use]
    pub fn builder(board_id: BoardId, kind: ArtifactKind, payload: Value) -> ArtifactRecordBuilder {
        ArtifactRecordBuilder {
            artifact_id: Uuid::new_v4(),
            board_id,
            kind,
            key: None,
            written_at: SystemTime::now(),
            payload,
        }
    }

    /// Returns the unique identifier for this artifact.
    #[must_use]
    pub fn artifact_id(&self) -> Uuid {
        self.artifact_id
    }

    /// Returns the owning board.
    #[must_use]
    pub fn board_id(&self) -> &BoardId {
        &self.board_id
    }

    /// Returns the artifact kind.
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Returns the lookup key, unique per board and kind.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Returns when the record was created.
    #[must_use]
    pub fn written_at(&self) -> SystemTime {
        self.written_at
    }

    /// Returns the JSON payload.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Consumes the record and returns its payload.
    #[must_use]
    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// Returns the reference a store reports for this record.
    #[must_use]
    pub fn reference(&self) -> ArtifactRef {
        ArtifactRef::new(&self.board_id, self.kind, self.artifact_id)
    }
}

/// Builder type used to assemble [`ArtifactRecord`] instances safely.
#[derive(Debug)]
pub struct ArtifactRecordBuilder {
    artifact_id: Uuid,
    board_id: BoardId,
    kind: ArtifactKind,
    key: Option<String>,
    written_at: SystemTime,
    payload: Value,
}

impl ArtifactRecordBuilder {
    /// Overrides the artifact identifier.
    #[must_use]
    pub fn artifact_id(mut self, artifact_id: Uuid) -> Self {
        self.artifact_id = artifact_id;
        self
    }

    /// Sets the lookup key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidRecord`] when the key is empty or whitespace.
    pub fn key(mut self, key: impl Into<String>) -> StoreResult<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(StoreError::InvalidRecord("artifact key must not be empty"));
        }
        self.key = Some(key);
        Ok(self)
    }

    /// Sets the creation timestamp.
    #[must_use]
    pub fn written_at(mut self, written_at: SystemTime) -> Self {
        self.written_at = written_at;
        self
    }

    /// Finalises the builder and produces the record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidRecord`] when the payload is not a JSON object.
    pub fn build(self) -> StoreResult<ArtifactRecord> {
        if !self.payload.is_object() {
            return Err(StoreError::InvalidRecord(
                "artifact payload must be a JSON object",
            ));
        }
        Ok(ArtifactRecord {
            artifact_id: self.artifact_id,
            board_id: self.board_id,
            kind: self.kind,
            key: self.key,
            written_at: self.written_at,
            payload: self.payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn board() -> BoardId {
        BoardId::new("board-a").unwrap()
    }

    #[test]
    fn builder_rejects_blank_key_and_scalar_payload() {
        let err = ArtifactRecord::builder(board(), ArtifactKind::Decision, json!({}))
            .key(" ")
            .expect_err("blank key should fail");
        assert!(matches!(err, StoreError::InvalidRecord(_)));

        let err = ArtifactRecord::builder(board(), ArtifactKind::Decision, json!(42))
            .build()
            .expect_err("scalar payload should fail");
        assert!(matches!(err, StoreError::InvalidRecord(_)));
    }

    #[test]
    fn reference_is_derived_from_identity() {
        let id = Uuid::new_v4();
        let record = ArtifactRecord::builder(board(), ArtifactKind::PersonaSet, json!({"a": 1}))
            .artifact_id(id)
            .build()
            .unwrap();

        assert_eq!(
            record.reference().as_str(),
            format!("board-a/persona_set/{id}")
        );
    }
}
