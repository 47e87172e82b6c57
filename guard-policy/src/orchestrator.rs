//! The guard pipeline.
//!
//! A request moves through validation, idempotent replay, panel resolution,
//! voting, aggregation, decision mapping, reputation update and persistence,
//! strictly in that order. [`ActionGuard::handle`] is the only error boundary:
//! every failure, panics included, leaves it as an [`ErrorResponse`].

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use futures::FutureExt;
use guard_config::GuardConfig;
use guard_primitives::{BoardId, DecisionId, PersonaSet, PersonaSetId, Vote};
use guard_store::{ArtifactKind, ArtifactRef, ArtifactStore, IdempotencyKey};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregate::WeightedApprovalAggregator;
use crate::contracts::{Constraints, GuardRequest, ProposedAction, VoteSource};
use crate::decision::{
    AggregationResult, BoardWrite, Decision, DecisionParts, GuardDecision, GuardResponse,
};
use crate::error::{ErrorResponse, GuardError, GuardResult};
use crate::generator::TemplatePersonaGenerator;
use crate::integrations::{
    AggregationPolicy, Aggregator, HardBlockDetector, PanelRequest, PersonaGenerator,
    ReputationUpdater, TaskContext,
};
use crate::repository::BoardLedger;
use crate::reputation::AlignmentReputationUpdater;
use crate::synthesis::VoteSynthesizer;

/// Who votes on a request once its panel (if any) is resolved.
enum Electorate {
    Panel(PersonaSet),
    External(Vec<Vote>),
}

impl Electorate {
    /// Casts the ballot, returning the voting panel alongside the votes.
    fn cast(
        self,
        synthesizer: &VoteSynthesizer,
        action: &ProposedAction,
        constraints: &Constraints,
    ) -> (Option<PersonaSet>, Vec<Vote>) {
        match self {
            Self::Panel(panel) => {
                let votes = synthesizer.synthesize(&panel, action, constraints);
                (Some(panel), votes)
            }
            Self::External(votes) => (None, votes),
        }
    }
}

/// Evaluates proposed agent actions and records binding verdicts.
pub struct ActionGuard {
    ledger: BoardLedger,
    synthesizer: VoteSynthesizer,
    generator: Arc<dyn PersonaGenerator>,
    aggregator: Arc<dyn Aggregator>,
    reputation: Arc<dyn ReputationUpdater>,
    config: GuardConfig,
}

impl fmt::Debug for ActionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionGuard")
            .field("ledger", &self.ledger)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ActionGuard {
    /// Creates a guard over `store` with the reference collaborators and the
    /// default configuration.
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            ledger: BoardLedger::new(store),
            synthesizer: VoteSynthesizer::default(),
            generator: Arc::new(TemplatePersonaGenerator::new()),
            aggregator: Arc::new(WeightedApprovalAggregator::new()),
            reputation: Arc::new(AlignmentReputationUpdater::new()),
            config: GuardConfig::default(),
        }
    }

    /// Replaces the persona generator.
    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn PersonaGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Replaces the aggregator.
    #[must_use]
    pub fn with_aggregator(mut self, aggregator: Arc<dyn Aggregator>) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Replaces the reputation updater.
    #[must_use]
    pub fn with_reputation_updater(mut self, reputation: Arc<dyn ReputationUpdater>) -> Self {
        self.reputation = reputation;
        self
    }

    /// Replaces the hard-block detector used during vote synthesis.
    #[must_use]
    pub fn with_detector(mut self, detector: Arc<dyn HardBlockDetector>) -> Self {
        self.synthesizer = VoteSynthesizer::new(detector);
        self
    }

    /// Applies threshold and panel settings from `config`.
    #[must_use]
    pub fn with_config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Evaluates a raw JSON request.
    ///
    /// Never fails: errors, including panics inside collaborators, are
    /// rendered as an error response carrying the best-known board id.
    pub async fn handle(&self, input: &Value) -> GuardResponse {
        let board_hint = input
            .get("board_id")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let outcome = AssertUnwindSafe(self.process(input))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(GuardError::Panicked(panic_message(payload.as_ref()))));

        match outcome {
            Ok(decision) => GuardResponse::Decision(Box::new(decision)),
            Err(err) => {
                warn!(board_id = board_hint, code = ?err.code(), error = %err, "guard request failed");
                GuardResponse::Error(ErrorResponse::new(board_hint, &err))
            }
        }
    }

    async fn process(&self, input: &Value) -> GuardResult<Decision> {
        let request = GuardRequest::parse(input)?;
        self.evaluate(request).await
    }

    /// Evaluates a typed request, replaying the recorded decision when the same
    /// logical request was decided before.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's [`GuardError`].
    pub async fn evaluate(&self, request: GuardRequest) -> GuardResult<Decision> {
        let key = request.idempotency_key()?;
        if let Some(prior) = self.ledger.recorded_decision(request.board_id(), &key).await? {
            info!(
                board_id = %prior.board_id(),
                decision_id = %prior.decision_id(),
                idempotency_key = %key,
                "replaying recorded decision"
            );
            return Ok(prior);
        }

        let (board_id, action, constraints, requested_panel, source) = request.into_parts();
        let electorate = match source {
            VoteSource::Synthesized => {
                Electorate::Panel(self.resolve_panel(&board_id, requested_panel.as_ref()).await?)
            }
            VoteSource::Supplied(votes) => Electorate::External(votes),
        };
        let (panel, votes) = electorate.cast(&self.synthesizer, &action, &constraints);
        debug!(board_id = %board_id, votes = votes.len(), "votes collected");

        let policy = AggregationPolicy::weighted_approval(self.config.approve_threshold);
        let aggregation = self.aggregator.aggregate(&votes, &policy)?;
        let final_decision = GuardDecision::from(aggregation.final_decision());
        debug!(
            board_id = %board_id,
            outcome = aggregation.final_decision().as_str(),
            final_decision = final_decision.as_str(),
            "aggregated votes"
        );

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let decision_artifact = Uuid::new_v4();
        let decision_ref = ArtifactRef::new(&board_id, ArtifactKind::Decision, decision_artifact);
        let mut board_writes = vec![BoardWrite::committed(ArtifactKind::Decision, decision_ref.clone())];

        let (persona_set_id, persona_updates, successor) = match panel {
            Some(panel) => {
                let update =
                    self.reputation
                        .update(panel.personas(), &votes, aggregation.final_decision())?;
                let successor = panel.evolve(update.personas, timestamp.clone());
                let panel_artifact = Uuid::new_v4();
                board_writes.push(BoardWrite::committed(
                    ArtifactKind::PersonaSet,
                    ArtifactRef::new(&board_id, ArtifactKind::PersonaSet, panel_artifact),
                ));
                (
                    Some(panel.persona_set_id().clone()),
                    update.updates,
                    Some((panel_artifact, successor)),
                )
            }
            None => (requested_panel, Vec::new(), None),
        };

        let decision = Decision::from_parts(DecisionParts {
            board_id,
            decision_id: DecisionId::random(),
            timestamp,
            persona_set_id,
            votes,
            aggregation: aggregation.summary().clone(),
            final_decision,
            persona_updates,
            board_writes,
        });
        let decision = match self
            .commit(&key, decision_artifact, &decision_ref, &aggregation, decision)
            .await?
        {
            Commit::Recorded(decision) => decision,
            Commit::Superseded(winner) => return Ok(winner),
        };

        if let Some((artifact_id, successor)) = successor {
            self.advance_panel(decision.board_id(), artifact_id, &successor)
                .await?;
        }
        Ok(decision)
    }

    async fn resolve_panel(
        &self,
        board_id: &BoardId,
        requested: Option<&PersonaSetId>,
    ) -> GuardResult<PersonaSet> {
        let existing = match requested {
            Some(persona_set_id) => {
                let found = self.ledger.panel(board_id, persona_set_id).await?;
                if found.is_none() {
                    warn!(
                        board_id = %board_id,
                        persona_set_id = %persona_set_id,
                        "requested panel not found; generating a new one"
                    );
                }
                found
            }
            None => self.ledger.latest_panel(board_id).await?,
        };
        if let Some(panel) = existing {
            return Ok(panel);
        }

        let request = PanelRequest {
            board_id: board_id.clone(),
            task_context: TaskContext::action_guard(),
            n_personas: self.config.persona_count,
            persona_pack: self.config.persona_pack.clone(),
        };
        let panel = self
            .generator
            .generate(&request)
            .await
            .map_err(|err| GuardError::PersonaGeneration(err.to_string()))?;

        match self.ledger.record_panel(board_id, &panel, Uuid::new_v4()).await {
            Ok(reference) => {
                debug!(
                    board_id = %board_id,
                    persona_set_id = %panel.persona_set_id(),
                    %reference,
                    "recorded generated panel"
                );
            }
            Err(GuardError::Store(err)) if err.is_conflict() => {
                debug!(
                    board_id = %board_id,
                    persona_set_id = %panel.persona_set_id(),
                    "generated panel already recorded"
                );
            }
            Err(err) => return Err(err),
        }
        Ok(panel)
    }

    async fn commit(
        &self,
        key: &IdempotencyKey,
        artifact_id: Uuid,
        expected_ref: &ArtifactRef,
        aggregation: &AggregationResult,
        decision: Decision,
    ) -> GuardResult<Commit> {
        match self
            .ledger
            .record_decision(key, artifact_id, aggregation, &decision)
            .await
        {
            Ok(reference) => {
                if &reference != expected_ref {
                    warn!(
                        expected = %expected_ref,
                        reported = %reference,
                        "store reported an unexpected decision reference"
                    );
                }
                info!(
                    board_id = %decision.board_id(),
                    decision_id = %decision.decision_id(),
                    idempotency_key = %key,
                    final_decision = decision.final_decision().as_str(),
                    "decision recorded"
                );
                Ok(Commit::Recorded(decision))
            }
            Err(GuardError::Store(err)) if err.is_conflict() => {
                warn!(
                    board_id = %decision.board_id(),
                    idempotency_key = %key,
                    "concurrent decision won the key; returning it"
                );
                self.ledger
                    .recorded_decision(decision.board_id(), key)
                    .await?
                    .map(Commit::Superseded)
                    .ok_or_else(|| GuardError::CorruptArtifact {
                        kind: "decision",
                        reason: format!("decision under key {key} carries no response"),
                    })
            }
            Err(err) => Err(err),
        }
    }

    /// Appends the evolved panel once its decision is committed.
    async fn advance_panel(
        &self,
        board_id: &BoardId,
        artifact_id: Uuid,
        successor: &PersonaSet,
    ) -> GuardResult<()> {
        let expected = ArtifactRef::new(board_id, ArtifactKind::PersonaSet, artifact_id);
        let reference = self
            .ledger
            .record_panel(board_id, successor, artifact_id)
            .await?;
        if reference != expected {
            warn!(
                expected = %expected,
                reported = %reference,
                "store reported an unexpected panel reference"
            );
        }
        debug!(
            board_id = %board_id,
            persona_set_id = %successor.persona_set_id(),
            parent = ?successor.parent().map(PersonaSetId::as_str),
            "recorded evolved panel"
        );
        Ok(())
    }
}

/// Outcome of committing a decision under its idempotency key.
enum Commit {
    /// This request's decision now holds the key.
    Recorded(Decision),
    /// A concurrent duplicate committed first; its decision is returned.
    Superseded(Decision),
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}

#[cfg(test)]
mod tests {
    use guard_store::MemoryArtifactStore;
    use serde_json::json;

    use super::*;
    use crate::error::ErrorCode;

    struct PanickingAggregator;

    impl Aggregator for PanickingAggregator {
        fn aggregate(&self, _votes: &[Vote], _policy: &AggregationPolicy) -> GuardResult<AggregationResult> {
            panic!("tally overflow");
        }
    }

    fn guard() -> ActionGuard {
        ActionGuard::new(Arc::new(MemoryArtifactStore::new()))
    }

    #[tokio::test]
    async fn invalid_input_echoes_board_id() {
        let response = guard()
            .handle(&json!({"board_id": "b1", "proposed_action": {}, "extra": 1}))
            .await;
        let error = response.error().expect("error response");
        assert_eq!(error.board_id, "b1");
        assert_eq!(error.error.code, ErrorCode::InvalidInput);
        assert_eq!(error.error.message, "input contains unknown field `extra`");

        let response = guard().handle(&json!([1, 2])).await;
        assert_eq!(response.error().unwrap().board_id, "");
    }

    #[tokio::test]
    async fn panics_become_generic_failures() {
        let guard = guard().with_aggregator(Arc::new(PanickingAggregator));
        let response = guard
            .handle(&json!({"board_id": "b1", "proposed_action": {"action_type": "noop"}}))
            .await;
        let error = response.error().expect("error response");
        assert_eq!(error.error.code, ErrorCode::AgentActionGuardFailed);
        assert!(error.error.message.contains("tally overflow"));
    }

    #[tokio::test]
    async fn external_votes_skip_panel_and_reputation() {
        let response = guard()
            .handle(&json!({
                "board_id": "b1",
                "proposed_action": {"action_type": "deploy", "summary": "Ship build"},
                "mode": "external_agent",
                "persona_set_id": "pinned",
                "external_votes": [
                    {"persona_id": "a", "name": "Agent A", "reputation_before": 1.0, "vote": "YES", "source": "ci"}
                ]
            }))
            .await;
        let decision = response.decision().expect("decision");
        assert_eq!(decision.final_decision(), GuardDecision::Allow);
        assert_eq!(decision.persona_set_id().map(PersonaSetId::as_str), Some("pinned"));
        assert!(decision.persona_updates().is_empty());
        assert_eq!(decision.board_writes().len(), 1);
        assert_eq!(decision.votes()[0].as_value()["source"], "ci");
    }
}
