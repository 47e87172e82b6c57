//! Verdict types: aggregate outcomes, the guard decision vocabulary, and the
//! durable decision record.

use guard_primitives::{BoardId, DecisionId, PersonaId, PersonaSetId, Vote};
use guard_store::{ArtifactKind, ArtifactRef};
use serde::{Deserialize, Serialize};

use crate::error::ErrorResponse;

/// Required action attached to blocked decisions.
pub const DO_NOT_EXECUTE: &str = "Do not execute action";
/// Required action attached to rewrite decisions.
pub const ADD_HUMAN_CONFIRMATION: &str = "Add human confirmation step";

/// Raw verdict in the aggregator's own vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AggregateOutcome {
    /// Votes approve the action.
    Approve,
    /// Votes ask for the action to be rewritten.
    Rewrite,
    /// Votes reject the action.
    Block,
    /// Any other verdict label.
    Other(String),
}

impl AggregateOutcome {
    /// Returns the wire label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Approve => "APPROVE",
            Self::Rewrite => "REWRITE",
            Self::Block => "BLOCK",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for AggregateOutcome {
    fn from(value: String) -> Self {
        match value.as_str() {
            "APPROVE" => Self::Approve,
            "REWRITE" => Self::Rewrite,
            "BLOCK" => Self::Block,
            _ => Self::Other(value),
        }
    }
}

impl From<AggregateOutcome> for String {
    fn from(value: AggregateOutcome) -> Self {
        match value {
            AggregateOutcome::Other(label) => label,
            known => known.as_str().to_owned(),
        }
    }
}

/// Weighted tallies shared by the aggregation result and the decision record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationSummary {
    /// Aggregation method identifier.
    pub method: String,
    /// Reputation-weighted YES tally.
    pub weighted_yes: f64,
    /// Reputation-weighted NO tally.
    pub weighted_no: f64,
    /// Reputation-weighted REWRITE tally.
    pub weighted_rewrite: f64,
    /// True when a vote carried a flag that blocks regardless of tallies.
    pub hard_block: bool,
    /// One-line explanation of the verdict.
    pub rationale: String,
}

/// Output of an [`Aggregator`](crate::integrations::Aggregator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    #[serde(flatten)]
    summary: AggregationSummary,
    final_decision: AggregateOutcome,
}

impl AggregationResult {
    /// Pairs the tallies with the raw verdict.
    #[must_use]
    pub fn new(summary: AggregationSummary, final_decision: AggregateOutcome) -> Self {
        Self {
            summary,
            final_decision,
        }
    }

    /// Returns the tallies without the raw verdict.
    #[must_use]
    pub fn summary(&self) -> &AggregationSummary {
        &self.summary
    }

    /// Returns the raw verdict.
    #[must_use]
    pub fn final_decision(&self) -> &AggregateOutcome {
        &self.final_decision
    }
}

/// Binding verdict returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuardDecision {
    /// The action may be executed.
    Allow,
    /// The action must be rewritten with a human confirmation step first.
    RequireRewrite,
    /// The action must not be executed.
    Block,
}

impl GuardDecision {
    /// Returns the remedial actions the caller must take before proceeding.
    #[must_use]
    pub fn required_actions(self) -> Vec<String> {
        match self {
            Self::Allow => Vec::new(),
            Self::RequireRewrite => vec![ADD_HUMAN_CONFIRMATION.to_owned()],
            Self::Block => vec![DO_NOT_EXECUTE.to_owned()],
        }
    }

    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::RequireRewrite => "REQUIRE_REWRITE",
            Self::Block => "BLOCK",
        }
    }
}

impl From<&AggregateOutcome> for GuardDecision {
    /// Any verdict other than approve or rewrite degrades to [`GuardDecision::Block`].
    fn from(outcome: &AggregateOutcome) -> Self {
        match outcome {
            AggregateOutcome::Approve => Self::Allow,
            AggregateOutcome::Rewrite => Self::RequireRewrite,
            _ => Self::Block,
        }
    }
}

/// Change log entry for one persona's reputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaUpdate {
    /// Persona whose weight changed.
    pub persona_id: PersonaId,
    /// Persona display name.
    pub name: String,
    /// Weight before the decision.
    pub reputation_before: f64,
    /// Weight after the decision.
    pub reputation_after: f64,
    /// Signed change.
    pub delta: f64,
    /// Why the weight moved.
    pub reason: String,
}

/// Receipt for one artifact written while recording a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardWrite {
    /// Kind of artifact written.
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    /// Whether the write was committed.
    pub success: bool,
    /// Store reference of the artifact.
    #[serde(rename = "ref")]
    pub reference: ArtifactRef,
}

impl BoardWrite {
    /// Receipt for a committed write.
    #[must_use]
    pub fn committed(kind: ArtifactKind, reference: ArtifactRef) -> Self {
        Self {
            kind,
            success: true,
            reference,
        }
    }
}

/// The durable decision record, also returned as the success response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    board_id: BoardId,
    decision_id: DecisionId,
    timestamp: String,
    persona_set_id: Option<PersonaSetId>,
    votes: Vec<Vote>,
    aggregation: AggregationSummary,
    final_decision: GuardDecision,
    required_actions: Vec<String>,
    persona_updates: Vec<PersonaUpdate>,
    board_writes: Vec<BoardWrite>,
}

/// Inputs assembled by the orchestrator for a new [`Decision`].
#[derive(Debug)]
pub(crate) struct DecisionParts {
    pub board_id: BoardId,
    pub decision_id: DecisionId,
    pub timestamp: String,
    pub persona_set_id: Option<PersonaSetId>,
    pub votes: Vec<Vote>,
    pub aggregation: AggregationSummary,
    pub final_decision: GuardDecision,
    pub persona_updates: Vec<PersonaUpdate>,
    pub board_writes: Vec<BoardWrite>,
}

impl Decision {
    pub(crate) fn from_parts(parts: DecisionParts) -> Self {
        Self {
            required_actions: parts.final_decision.required_actions(),
            board_id: parts.board_id,
            decision_id: parts.decision_id,
            timestamp: parts.timestamp,
            persona_set_id: parts.persona_set_id,
            votes: parts.votes,
            aggregation: parts.aggregation,
            final_decision: parts.final_decision,
            persona_updates: parts.persona_updates,
            board_writes: parts.board_writes,
        }
    }

    /// Returns the board scope.
    #[must_use]
    pub fn board_id(&self) -> &BoardId {
        &self.board_id
    }

    /// Returns the unique decision identifier.
    #[must_use]
    pub fn decision_id(&self) -> DecisionId {
        self.decision_id
    }

    /// Returns the RFC 3339 creation timestamp.
    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Returns the panel that voted, or the requested panel in external mode.
    #[must_use]
    pub fn persona_set_id(&self) -> Option<&PersonaSetId> {
        self.persona_set_id.as_ref()
    }

    /// Returns the votes.
    #[must_use]
    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    /// Returns the aggregation tallies.
    #[must_use]
    pub fn aggregation(&self) -> &AggregationSummary {
        &self.aggregation
    }

    /// Returns the verdict.
    #[must_use]
    pub fn final_decision(&self) -> GuardDecision {
        self.final_decision
    }

    /// Returns the remedial actions.
    #[must_use]
    pub fn required_actions(&self) -> &[String] {
        &self.required_actions
    }

    /// Returns the reputation change log.
    #[must_use]
    pub fn persona_updates(&self) -> &[PersonaUpdate] {
        &self.persona_updates
    }

    /// Returns the write receipts.
    #[must_use]
    pub fn board_writes(&self) -> &[BoardWrite] {
        &self.board_writes
    }
}

/// Outcome of [`ActionGuard::handle`](crate::ActionGuard::handle).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GuardResponse {
    /// The request failed; no decision was recorded for it.
    Error(ErrorResponse),
    /// The recorded (or replayed) decision.
    Decision(Box<Decision>),
}

impl GuardResponse {
    /// Returns the decision, if the request succeeded.
    #[must_use]
    pub fn decision(&self) -> Option<&Decision> {
        match self {
            Self::Decision(decision) => Some(decision),
            Self::Error(_) => None,
        }
    }

    /// Returns the error, if the request failed.
    #[must_use]
    pub fn error(&self) -> Option<&ErrorResponse> {
        match self {
            Self::Error(error) => Some(error),
            Self::Decision(_) => None,
        }
    }

    /// Returns true when the request failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn mapper_degrades_unknown_verdicts_to_block() {
        assert_eq!(
            GuardDecision::from(&AggregateOutcome::Approve),
            GuardDecision::Allow
        );
        assert_eq!(
            GuardDecision::from(&AggregateOutcome::Rewrite),
            GuardDecision::RequireRewrite
        );
        assert_eq!(
            GuardDecision::from(&AggregateOutcome::Block),
            GuardDecision::Block
        );
        let other = AggregateOutcome::from("ESCALATE".to_owned());
        assert_eq!(GuardDecision::from(&other), GuardDecision::Block);
    }

    #[test]
    fn required_actions_follow_verdict() {
        assert!(GuardDecision::Allow.required_actions().is_empty());
        assert_eq!(
            GuardDecision::RequireRewrite.required_actions(),
            [ADD_HUMAN_CONFIRMATION]
        );
        assert_eq!(GuardDecision::Block.required_actions(), [DO_NOT_EXECUTE]);
    }

    #[test]
    fn aggregation_result_flattens_summary() {
        let result = AggregationResult::new(
            AggregationSummary {
                method: "WEIGHTED_APPROVAL_VOTE".into(),
                weighted_yes: 0.0,
                weighted_no: 2.5,
                weighted_rewrite: 0.0,
                hard_block: true,
                rationale: "hard block".into(),
            },
            AggregateOutcome::Block,
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["final_decision"], "BLOCK");
        assert_eq!(value["weighted_no"], 2.5);
        assert_eq!(serde_json::from_value::<AggregationResult>(value).unwrap(), result);
    }

    #[test]
    fn board_write_uses_wire_names() {
        let write: BoardWrite = serde_json::from_value(json!({
            "type": "persona_set", "success": true, "ref": "b/persona_set/1"
        }))
        .unwrap();
        assert_eq!(write.kind, ArtifactKind::PersonaSet);
        assert_eq!(write.reference.as_str(), "b/persona_set/1");
    }
}
