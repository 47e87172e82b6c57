//! In-process artifact store for tests and single-process deployments.

use async_trait::async_trait;
use guard_primitives::BoardId;
use tokio::sync::RwLock;
use tracing::debug;

use crate::StoreResult;
use crate::record::{ArtifactKind, ArtifactRecord, ArtifactRef};
use crate::store::{ArtifactIndex, ArtifactStore};

/// Artifact store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    inner: RwLock<ArtifactIndex>,
}

impl MemoryArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn write(&self, record: ArtifactRecord) -> StoreResult<ArtifactRef> {
        let mut guard = self.inner.write().await;
        guard.ensure_unique(&record)?;
        let reference = record.reference();
        debug!(board_id = %record.board_id(), kind = %record.kind(), %reference, "artifact stored");
        guard.insert(record);
        Ok(reference)
    }

    async fn latest(
        &self,
        board_id: &BoardId,
        kind: ArtifactKind,
    ) -> StoreResult<Option<ArtifactRecord>> {
        Ok(self.inner.read().await.latest(board_id, kind).cloned())
    }

    async fn find(
        &self,
        board_id: &BoardId,
        kind: ArtifactKind,
        key: &str,
    ) -> StoreResult<Option<ArtifactRecord>> {
        Ok(self.inner.read().await.find(board_id, kind, key).cloned())
    }

    async fn list(
        &self,
        board_id: &BoardId,
        kind: ArtifactKind,
    ) -> StoreResult<Vec<ArtifactRecord>> {
        Ok(self.inner.read().await.list(board_id, kind))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn board(id: &str) -> BoardId {
        BoardId::new(id).unwrap()
    }

    fn record(board_id: &str, kind: ArtifactKind, key: &str, n: u32) -> ArtifactRecord {
        ArtifactRecord::builder(board(board_id), kind, json!({ "n": n }))
            .key(key)
            .unwrap()
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn latest_is_scoped_by_board_and_kind() {
        let store = MemoryArtifactStore::new();
        store
            .write(record("a", ArtifactKind::PersonaSet, "p1", 1))
            .await
            .unwrap();
        store
            .write(record("a", ArtifactKind::PersonaSet, "p2", 2))
            .await
            .unwrap();
        store
            .write(record("a", ArtifactKind::Decision, "k1", 3))
            .await
            .unwrap();
        store
            .write(record("b", ArtifactKind::PersonaSet, "p3", 4))
            .await
            .unwrap();

        let latest = store
            .latest(&board("a"), ArtifactKind::PersonaSet)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.payload()["n"], 2);
        assert!(
            store
                .latest(&board("c"), ArtifactKind::PersonaSet)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(
            store
                .list(&board("a"), ArtifactKind::PersonaSet)
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn duplicate_key_conflicts() {
        let store = MemoryArtifactStore::new();
        store
            .write(record("a", ArtifactKind::Decision, "k1", 1))
            .await
            .unwrap();
        let err = store
            .write(record("a", ArtifactKind::Decision, "k1", 2))
            .await
            .expect_err("duplicate key");
        assert!(err.is_conflict());

        // Same key on another board or kind is independent.
        store
            .write(record("b", ArtifactKind::Decision, "k1", 3))
            .await
            .unwrap();
        store
            .write(record("a", ArtifactKind::PersonaSet, "k1", 4))
            .await
            .unwrap();

        let found = store
            .find(&board("a"), ArtifactKind::Decision, "k1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.payload()["n"], 1);
    }
}
