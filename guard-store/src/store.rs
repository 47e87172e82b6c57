//! Artifact store trait and the shared per-board index.

use std::collections::HashMap;

use async_trait::async_trait;
use guard_primitives::BoardId;

use crate::record::{ArtifactKind, ArtifactRecord, ArtifactRef};
use crate::{StoreError, StoreResult};

/// Durable, board-scoped record store backing decisions and persona panels.
///
/// Implementations must reject a write whose `(board, kind, key)` already
/// exists with [`StoreError::Conflict`], atomically with respect to other
/// writes. Decisions are exactly-once per idempotency key only under that
/// guarantee.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persists a record and returns its reference.
    async fn write(&self, record: ArtifactRecord) -> StoreResult<ArtifactRef>;

    /// Returns the most recently written record of `kind` on the board.
    async fn latest(
        &self,
        board_id: &BoardId,
        kind: ArtifactKind,
    ) -> StoreResult<Option<ArtifactRecord>>;

    /// Returns the record of `kind` on the board carrying `key`.
    async fn find(
        &self,
        board_id: &BoardId,
        kind: ArtifactKind,
        key: &str,
    ) -> StoreResult<Option<ArtifactRecord>>;

    /// Returns every record of `kind` on the board, oldest first.
    async fn list(&self, board_id: &BoardId, kind: ArtifactKind)
    -> StoreResult<Vec<ArtifactRecord>>;
}

/// In-memory index shared by the bundled stores.
#[derive(Debug, Default)]
pub(crate) struct ArtifactIndex {
    boards: HashMap<BoardId, Vec<ArtifactRecord>>,
}

impl ArtifactIndex {
    pub(crate) fn ensure_unique(&self, record: &ArtifactRecord) -> StoreResult<()> {
        let Some(key) = record.key() else {
            return Ok(());
        };
        if self.find(record.board_id(), record.kind(), key).is_some() {
            return Err(StoreError::Conflict {
                board_id: record.board_id().to_string(),
                kind: record.kind(),
                key: key.to_owned(),
            });
        }
        Ok(())
    }

    pub(crate) fn insert(&mut self, record: ArtifactRecord) {
        self.boards
            .entry(record.board_id().clone())
            .or_default()
            .push(record);
    }

    pub(crate) fn latest(&self, board_id: &BoardId, kind: ArtifactKind) -> Option<&ArtifactRecord> {
        self.boards
            .get(board_id)?
            .iter()
            .rev()
            .find(|record| record.kind() == kind)
    }

    pub(crate) fn find(
        &self,
        board_id: &BoardId,
        kind: ArtifactKind,
        key: &str,
    ) -> Option<&ArtifactRecord> {
        self.boards
            .get(board_id)?
            .iter()
            .find(|record| record.kind() == kind && record.key() == Some(key))
    }

    pub(crate) fn list(&self, board_id: &BoardId, kind: ArtifactKind) -> Vec<ArtifactRecord> {
        self.boards
            .get(board_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| record.kind() == kind)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
