//! Typed access to the artifacts a board keeps: persona panels and decisions.

use std::sync::Arc;

use guard_primitives::{BoardId, PersonaSet, PersonaSetId};
use guard_store::{ArtifactKind, ArtifactRecord, ArtifactRef, ArtifactStore, IdempotencyKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::decision::{AggregationResult, Decision, GuardDecision};
use crate::error::{GuardError, GuardResult};

/// Payload of a stored decision artifact.
///
/// `response` is the exact body returned to the caller, replayed verbatim for
/// repeated submissions.
#[derive(Debug, Serialize, Deserialize)]
struct DecisionArtifact {
    idempotency_key: IdempotencyKey,
    decision_id: String,
    final_decision: GuardDecision,
    votes: Value,
    aggregation: AggregationResult,
    #[serde(default)]
    response: Option<Decision>,
}

/// Board-scoped view over an [`ArtifactStore`].
#[derive(Clone)]
pub struct BoardLedger {
    store: Arc<dyn ArtifactStore>,
}

impl BoardLedger {
    /// Wraps `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    /// Returns the board's most recent panel.
    ///
    /// # Errors
    ///
    /// Fails on store errors or when the stored panel is unreadable.
    pub async fn latest_panel(&self, board_id: &BoardId) -> GuardResult<Option<PersonaSet>> {
        self.store
            .latest(board_id, ArtifactKind::PersonaSet)
            .await?
            .map(read_panel)
            .transpose()
    }

    /// Returns the named panel.
    ///
    /// # Errors
    ///
    /// Fails on store errors or when the stored panel is unreadable.
    pub async fn panel(
        &self,
        board_id: &BoardId,
        persona_set_id: &PersonaSetId,
    ) -> GuardResult<Option<PersonaSet>> {
        self.store
            .find(board_id, ArtifactKind::PersonaSet, persona_set_id.as_str())
            .await?
            .map(read_panel)
            .transpose()
    }

    /// Returns the decision previously recorded under `key`.
    ///
    /// # Errors
    ///
    /// Fails on store errors or when the stored decision is unreadable.
    pub async fn recorded_decision(
        &self,
        board_id: &BoardId,
        key: &IdempotencyKey,
    ) -> GuardResult<Option<Decision>> {
        let Some(record) = self
            .store
            .find(board_id, ArtifactKind::Decision, key.as_str())
            .await?
        else {
            return Ok(None);
        };
        let artifact: DecisionArtifact =
            serde_json::from_value(record.into_payload()).map_err(|err| corrupt("decision", &err))?;
        Ok(artifact.response)
    }

    /// Appends a panel version keyed by its identifier, stored under the
    /// pre-allocated `artifact_id`.
    ///
    /// # Errors
    ///
    /// Propagates store failures, including a conflict when the panel
    /// identifier is already recorded.
    pub async fn record_panel(
        &self,
        board_id: &BoardId,
        panel: &PersonaSet,
        artifact_id: Uuid,
    ) -> GuardResult<ArtifactRef> {
        let record = ArtifactRecord::builder(
            board_id.clone(),
            ArtifactKind::PersonaSet,
            serde_json::to_value(panel)?,
        )
        .artifact_id(artifact_id)
        .key(panel.persona_set_id().as_str())?
        .build()?;
        Ok(self.store.write(record).await?)
    }

    /// Commits `decision` under `key` using the pre-allocated `artifact_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Store`] wrapping a conflict when another decision
    /// already holds `key`.
    pub async fn record_decision(
        &self,
        key: &IdempotencyKey,
        artifact_id: Uuid,
        aggregation: &AggregationResult,
        decision: &Decision,
    ) -> GuardResult<ArtifactRef> {
        let artifact = DecisionArtifact {
            idempotency_key: key.clone(),
            decision_id: decision.decision_id().to_string(),
            final_decision: decision.final_decision(),
            votes: serde_json::to_value(decision.votes())?,
            aggregation: aggregation.clone(),
            response: Some(decision.clone()),
        };
        let record = ArtifactRecord::builder(
            decision.board_id().clone(),
            ArtifactKind::Decision,
            serde_json::to_value(&artifact)?,
        )
        .artifact_id(artifact_id)
        .key(key.as_str())?
        .build()?;
        Ok(self.store.write(record).await?)
    }
}

impl std::fmt::Debug for BoardLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardLedger").finish_non_exhaustive()
    }
}

fn read_panel(record: ArtifactRecord) -> GuardResult<PersonaSet> {
    serde_json::from_value(record.into_payload()).map_err(|err| corrupt("persona_set", &err))
}

fn corrupt(kind: &'static str, err: &serde_json::Error) -> GuardError {
    GuardError::CorruptArtifact {
        kind,
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use guard_primitives::{Persona, PersonaId};
    use guard_store::MemoryArtifactStore;
    use serde_json::json;

    use super::*;

    fn board() -> BoardId {
        BoardId::new("board-a").unwrap()
    }

    fn panel() -> PersonaSet {
        PersonaSet::new(
            PersonaSetId::generate(),
            vec![Persona::new(PersonaId::generate(), "Risk Analyst", 0.5).unwrap()],
        )
    }

    #[tokio::test]
    async fn panels_round_trip_through_store() {
        let ledger = BoardLedger::new(Arc::new(MemoryArtifactStore::new()));
        let root = panel();
        let child = root.evolve(root.personas().to_vec(), "2026-01-01T00:00:00.000Z");

        let artifact_id = Uuid::new_v4();
        let reference = ledger.record_panel(&board(), &root, artifact_id).await.unwrap();
        assert_eq!(
            reference,
            ArtifactRef::new(&board(), ArtifactKind::PersonaSet, artifact_id)
        );
        ledger.record_panel(&board(), &child, Uuid::new_v4()).await.unwrap();

        let latest = ledger.latest_panel(&board()).await.unwrap().unwrap();
        assert_eq!(latest, child);
        assert_eq!(latest.parent(), Some(root.persona_set_id()));
        assert_eq!(
            ledger.panel(&board(), root.persona_set_id()).await.unwrap(),
            Some(root)
        );
        assert!(ledger.panel(&board(), &PersonaSetId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unreadable_panel_is_reported_as_corrupt() {
        let store = Arc::new(MemoryArtifactStore::new());
        let record = ArtifactRecord::builder(board(), ArtifactKind::PersonaSet, json!({"nope": true}))
            .build()
            .unwrap();
        store.write(record).await.unwrap();

        let err = BoardLedger::new(store).latest_panel(&board()).await.unwrap_err();
        assert!(matches!(err, GuardError::CorruptArtifact { kind: "persona_set", .. }));
    }

    #[tokio::test]
    async fn decision_without_response_replays_nothing() {
        let store = Arc::new(MemoryArtifactStore::new());
        let key = IdempotencyKey::derive(&json!({"board_id": "board-a"})).unwrap();
        let payload = json!({
            "idempotency_key": key,
            "decision_id": Uuid::new_v4().to_string(),
            "final_decision": "BLOCK",
            "votes": [],
            "aggregation": {
                "method": "WEIGHTED_APPROVAL_VOTE",
                "weighted_yes": 0.0, "weighted_no": 0.0, "weighted_rewrite": 0.0,
                "hard_block": false, "rationale": "no weighted votes cast",
                "final_decision": "BLOCK"
            }
        });
        let record = ArtifactRecord::builder(board(), ArtifactKind::Decision, payload)
            .key(key.as_str())
            .unwrap()
            .build()
            .unwrap();
        store.write(record).await.unwrap();

        let ledger = BoardLedger::new(store);
        assert!(ledger.recorded_decision(&board(), &key).await.unwrap().is_none());
    }
}
