//! Collaborator seams consumed by the orchestrator.
//!
//! Each concern the guard delegates (flag detection, aggregation, reputation
//! bookkeeping and panel generation) is a trait so callers can swap in their
//! own backends. Reference implementations live in sibling modules.

use async_trait::async_trait;
use guard_config::WEIGHTED_APPROVAL_VOTE;
use guard_primitives::{BoardId, Persona, PersonaSet, Vote};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decision::{AggregateOutcome, AggregationResult, PersonaUpdate};
use crate::error::GuardResult;

/// Detects categorical risk flags in free text.
pub trait HardBlockDetector: Send + Sync {
    /// Returns the flags raised by `text`, each at most once.
    fn detect(&self, text: &str) -> Vec<String>;
}

/// Policy handed to the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationPolicy {
    /// Aggregation method identifier.
    pub method: String,
    /// Share of weighted YES votes needed to approve.
    pub approve_threshold: f64,
}

impl AggregationPolicy {
    /// Weighted approval vote at the given threshold.
    #[must_use]
    pub fn weighted_approval(approve_threshold: f64) -> Self {
        Self {
            method: WEIGHTED_APPROVAL_VOTE.to_owned(),
            approve_threshold,
        }
    }
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self::weighted_approval(0.7)
    }
}

/// Folds votes into a raw verdict.
pub trait Aggregator: Send + Sync {
    /// Aggregates `votes` under `policy`.
    ///
    /// # Errors
    ///
    /// Implementations report unusable input or policy as a [`GuardError`](crate::GuardError).
    fn aggregate(&self, votes: &[Vote], policy: &AggregationPolicy) -> GuardResult<AggregationResult>;
}

/// Personas after a reputation pass, with the change log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReputationUpdate {
    /// Updated personas in panel order.
    pub personas: Vec<Persona>,
    /// One entry per persona whose weight was considered.
    pub updates: Vec<PersonaUpdate>,
}

/// Moves persona weights after a decision.
pub trait ReputationUpdater: Send + Sync {
    /// Adjusts `personas` given their `votes` and the raw `outcome`.
    ///
    /// # Errors
    ///
    /// Implementations report failures as a [`GuardError`](crate::GuardError).
    fn update(
        &self,
        personas: &[Persona],
        votes: &[Vote],
        outcome: &AggregateOutcome,
    ) -> GuardResult<ReputationUpdate>;
}

/// Task description handed to a persona generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContext {
    /// What the panel is for.
    pub goal: String,
    /// Who the panel serves.
    pub audience: String,
    /// Appetite for risk.
    pub risk_tolerance: String,
    /// Extra constraints on the panel.
    pub constraints: Vec<String>,
    /// Subject area.
    pub domain: String,
}

impl TaskContext {
    /// The fixed context used for action-guard panels.
    #[must_use]
    pub fn action_guard() -> Self {
        Self {
            goal: "agent action guard".into(),
            audience: "internal ops".into(),
            risk_tolerance: "medium".into(),
            constraints: Vec::new(),
            domain: "automation".into(),
        }
    }
}

/// Request for a fresh persona panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelRequest {
    /// Board the panel is generated for.
    pub board_id: BoardId,
    /// What the panel should evaluate.
    pub task_context: TaskContext,
    /// Number of personas to generate.
    pub n_personas: usize,
    /// Template pack to draw from.
    pub persona_pack: String,
}

/// Failures reported by persona generators.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The requested pack does not exist.
    #[error("unknown persona pack `{0}`")]
    UnknownPack(String),
    /// The pack cannot supply the requested number of personas.
    #[error("cannot generate {requested} personas (pack holds {available})")]
    InvalidCount {
        /// Personas requested.
        requested: usize,
        /// Personas available.
        available: usize,
    },
    /// Backend failure.
    #[error("persona generation failed: {reason}")]
    Backend {
        /// Human-readable explanation.
        reason: String,
    },
}

impl From<guard_primitives::Error> for GenerationError {
    fn from(err: guard_primitives::Error) -> Self {
        Self::Backend {
            reason: err.to_string(),
        }
    }
}

/// Materializes a persona panel for a board that has none.
#[async_trait]
pub trait PersonaGenerator: Send + Sync {
    /// Generates a panel for `request`.
    async fn generate(&self, request: &PanelRequest) -> Result<PersonaSet, GenerationError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn panel_request_wire_shape() {
        let request = PanelRequest {
            board_id: BoardId::new("b1").unwrap(),
            task_context: TaskContext::action_guard(),
            n_personas: 5,
            persona_pack: "security".into(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "board_id": "b1",
                "task_context": {
                    "goal": "agent action guard",
                    "audience": "internal ops",
                    "risk_tolerance": "medium",
                    "constraints": [],
                    "domain": "automation"
                },
                "n_personas": 5,
                "persona_pack": "security"
            })
        );
    }

    #[test]
    fn default_policy_is_weighted_approval() {
        let policy = AggregationPolicy::default();
        assert_eq!(policy.method, "WEIGHTED_APPROVAL_VOTE");
        assert!((policy.approve_threshold - 0.7).abs() < f64::EPSILON);
    }
}
