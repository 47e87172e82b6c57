//! Guard request contracts and the closed-schema input validator.

use guard_primitives::{BoardId, PersonaSetId, Vote};
use guard_store::{IdempotencyKey, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{GuardError, GuardResult};

/// Keys accepted at the top level of a request.
pub const REQUEST_KEYS: &[&str] = &[
    "board_id",
    "proposed_action",
    "constraints",
    "persona_set_id",
    "mode",
    "external_votes",
];

/// Keys accepted inside `proposed_action`.
pub const ACTION_KEYS: &[&str] = &[
    "action_type",
    "target",
    "summary",
    "irreversible",
    "external_side_effect",
    "risk_level",
];

/// Keys accepted inside `constraints`.
pub const CONSTRAINT_KEYS: &[&str] = &[
    "require_human_confirm_for_irreversible",
    "block_sensitive_exfiltration",
];

/// Reports the first key of `obj` (in sorted order) not listed in `allowed`.
#[must_use]
pub fn reject_unknown(obj: &Map<String, Value>, allowed: &[&str], label: &str) -> Option<String> {
    obj.keys()
        .filter(|key| !allowed.contains(&key.as_str()))
        .min()
        .map(|key| format!("{label} contains unknown field `{key}`"))
}

/// Validates the raw request, returning the first violation found.
#[must_use]
pub fn validate(input: &Value) -> Option<String> {
    check(input).err()
}

fn check(input: &Value) -> Result<(), String> {
    let obj = input
        .as_object()
        .ok_or_else(|| "input must be object".to_owned())?;
    reject_unknown(obj, REQUEST_KEYS, "input").map_or(Ok(()), Err)?;

    match obj.get("board_id").and_then(Value::as_str) {
        Some(board) if !board.trim().is_empty() => {}
        _ => return Err("board_id is required".into()),
    }

    let action = obj
        .get("proposed_action")
        .and_then(Value::as_object)
        .ok_or_else(|| "proposed_action is required".to_owned())?;
    reject_unknown(action, ACTION_KEYS, "proposed_action").map_or(Ok(()), Err)?;

    if let Some(constraints) = obj.get("constraints") {
        let constraints = constraints
            .as_object()
            .ok_or_else(|| "constraints must be object".to_owned())?;
        reject_unknown(constraints, CONSTRAINT_KEYS, "constraints").map_or(Ok(()), Err)?;
    }

    if let Some(mode) = obj.get("mode") {
        if !matches!(mode.as_str(), Some("persona" | "external_agent")) {
            return Err("mode must be persona|external_agent".into());
        }
    }

    if obj.get("external_votes").is_some_and(|votes| !votes.is_array()) {
        return Err("external_votes must be array".into());
    }

    Ok(())
}

/// Declared risk of a proposed action.
///
/// Levels outside the known set are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RiskLevel {
    /// Low risk.
    Low,
    /// Medium risk.
    Medium,
    /// High risk.
    High,
    /// Critical risk.
    Critical,
    /// Any other label supplied by the caller.
    Unrecognized(String),
}

impl RiskLevel {
    /// Returns the wire label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
            Self::Unrecognized(label) => label,
        }
    }
}

impl From<String> for RiskLevel {
    fn from(value: String) -> Self {
        match value.as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<RiskLevel> for String {
    fn from(value: RiskLevel) -> Self {
        match value {
            RiskLevel::Unrecognized(label) => label,
            known => known.as_str().to_owned(),
        }
    }
}

/// The action an agent proposes to execute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProposedAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    action_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    irreversible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    external_side_effect: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    risk_level: Option<RiskLevel>,
}

impl ProposedAction {
    /// Returns the action type, empty when absent.
    #[must_use]
    pub fn action_type(&self) -> &str {
        self.action_type.as_deref().unwrap_or_default()
    }

    /// Returns the action target, empty when absent.
    #[must_use]
    pub fn target(&self) -> &str {
        self.target.as_deref().unwrap_or_default()
    }

    /// Returns the free-text summary, empty when absent.
    #[must_use]
    pub fn summary(&self) -> &str {
        self.summary.as_deref().unwrap_or_default()
    }

    /// Returns true when the action cannot be undone.
    #[must_use]
    pub fn is_irreversible(&self) -> bool {
        self.irreversible.unwrap_or(false)
    }

    /// Returns true when the action affects systems outside the agent.
    #[must_use]
    pub fn has_external_side_effect(&self) -> bool {
        self.external_side_effect.unwrap_or(false)
    }

    /// Returns the declared risk level.
    #[must_use]
    pub fn risk_level(&self) -> Option<&RiskLevel> {
        self.risk_level.as_ref()
    }

    /// Returns true when the declared risk level is `high`.
    #[must_use]
    pub fn is_high_risk(&self) -> bool {
        self.risk_level == Some(RiskLevel::High)
    }

    /// Text scanned for hard-block flags.
    #[must_use]
    pub fn screening_text(&self) -> String {
        format!("{}\n{}", self.action_type(), self.summary())
    }
}

/// Optional switches that parameterize vote synthesis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    require_human_confirm_for_irreversible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    block_sensitive_exfiltration: Option<bool>,
}

impl Constraints {
    /// Requires (or not) a human confirmation step for irreversible actions.
    #[must_use]
    pub fn with_human_confirmation(mut self, required: bool) -> Self {
        self.require_human_confirm_for_irreversible = Some(required);
        self
    }

    /// Blocks (or not) actions that appear to move sensitive data.
    #[must_use]
    pub fn with_exfiltration_block(mut self, block: bool) -> Self {
        self.block_sensitive_exfiltration = Some(block);
        self
    }

    /// Returns true when irreversible actions need human confirmation.
    #[must_use]
    pub fn requires_human_confirmation(&self) -> bool {
        self.require_human_confirm_for_irreversible.unwrap_or(false)
    }

    /// Returns true when sensitive-data actions must be blocked.
    #[must_use]
    pub fn blocks_sensitive_exfiltration(&self) -> bool {
        self.block_sensitive_exfiltration.unwrap_or(false)
    }
}

/// Who casts the votes for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum VoteSource {
    /// The board's persona panel votes through rule-based synthesis.
    Synthesized,
    /// An external agent supplied pre-formed votes.
    Supplied(Vec<Vote>),
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Mode {
    #[default]
    Persona,
    ExternalAgent,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRequest {
    board_id: BoardId,
    proposed_action: ProposedAction,
    #[serde(default)]
    constraints: Constraints,
    #[serde(default)]
    persona_set_id: Option<PersonaSetId>,
    #[serde(default)]
    mode: Mode,
    #[serde(default)]
    external_votes: Option<Vec<Value>>,
}

/// A validated guard request.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardRequest {
    board_id: BoardId,
    proposed_action: ProposedAction,
    constraints: Constraints,
    persona_set_id: Option<PersonaSetId>,
    source: VoteSource,
}

#[derive(Serialize)]
struct IdempotencyFields<'a> {
    board_id: &'a BoardId,
    proposed_action: &'a ProposedAction,
    constraints: &'a Constraints,
    persona_set_id: Option<&'a PersonaSetId>,
}

impl GuardRequest {
    /// Creates a panel-voted request.
    #[must_use]
    pub fn new(board_id: BoardId, proposed_action: ProposedAction) -> Self {
        Self {
            board_id,
            proposed_action,
            constraints: Constraints::default(),
            persona_set_id: None,
            source: VoteSource::Synthesized,
        }
    }

    /// Sets the constraints.
    #[must_use]
    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Pins the persona panel to use.
    #[must_use]
    pub fn with_persona_set(mut self, persona_set_id: PersonaSetId) -> Self {
        self.persona_set_id = Some(persona_set_id);
        self
    }

    /// Switches to externally supplied votes.
    #[must_use]
    pub fn with_external_votes(mut self, votes: Vec<Vote>) -> Self {
        self.source = VoteSource::Supplied(votes);
        self
    }

    /// Validates and converts a raw JSON request.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::InvalidInput`] for schema or type violations.
    /// External votes are taken as given; an empty `persona_set_id` pins
    /// nothing.
    pub fn parse(input: &Value) -> GuardResult<Self> {
        if let Some(violation) = validate(input) {
            return Err(GuardError::InvalidInput(violation));
        }
        let raw: RawRequest = serde_json::from_value(input.clone())
            .map_err(|err| GuardError::InvalidInput(err.to_string()))?;

        let source = match raw.mode {
            Mode::Persona => VoteSource::Synthesized,
            Mode::ExternalAgent => VoteSource::Supplied(
                raw.external_votes
                    .unwrap_or_default()
                    .into_iter()
                    .map(Vote::from)
                    .collect(),
            ),
        };

        Ok(Self {
            board_id: raw.board_id,
            proposed_action: raw.proposed_action,
            constraints: raw.constraints,
            persona_set_id: raw.persona_set_id.filter(|id| !id.as_str().is_empty()),
            source,
        })
    }

    /// Returns the board scope.
    #[must_use]
    pub fn board_id(&self) -> &BoardId {
        &self.board_id
    }

    /// Returns the proposed action.
    #[must_use]
    pub fn proposed_action(&self) -> &ProposedAction {
        &self.proposed_action
    }

    /// Returns the constraints.
    #[must_use]
    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// Returns the pinned persona panel, if any.
    #[must_use]
    pub fn persona_set_id(&self) -> Option<&PersonaSetId> {
        self.persona_set_id.as_ref()
    }

    /// Returns the vote source.
    #[must_use]
    pub fn source(&self) -> &VoteSource {
        &self.source
    }

    /// Derives the idempotency key from board, action, constraints, and panel.
    ///
    /// The vote source is not part of the key.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures.
    pub fn idempotency_key(&self) -> StoreResult<IdempotencyKey> {
        IdempotencyKey::derive(&IdempotencyFields {
            board_id: &self.board_id,
            proposed_action: &self.proposed_action,
            constraints: &self.constraints,
            persona_set_id: self.persona_set_id.as_ref(),
        })
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        BoardId,
        ProposedAction,
        Constraints,
        Option<PersonaSetId>,
        VoteSource,
    ) {
        (
            self.board_id,
            self.proposed_action,
            self.constraints,
            self.persona_set_id,
            self.source,
        )
    }
}
