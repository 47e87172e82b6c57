//! Votes cast by personas (or supplied by external agents) on a proposed action.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::persona::Persona;

/// Categorical risk tags attached to votes and detected from action text.
pub mod flags {
    /// High-risk action that cannot be undone.
    pub const HIGH_RISK_IRREVERSIBLE: &str = "HIGH_RISK_IRREVERSIBLE";
    /// Action text references sensitive data.
    pub const SENSITIVE_DATA: &str = "SENSITIVE_DATA";
    /// Action needs an explicit human confirmation step.
    pub const HUMAN_CONFIRM_REQUIRED: &str = "HUMAN_CONFIRM_REQUIRED";
    /// Action text contains a destructive shell or database command.
    pub const DESTRUCTIVE_COMMAND: &str = "DESTRUCTIVE_COMMAND";
}

/// Ballot choice of a single persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoteChoice {
    /// Action may proceed.
    Yes,
    /// Action must not proceed.
    No,
    /// Action may proceed only after it is rewritten.
    Rewrite,
}

impl VoteChoice {
    /// Returns the wire label of the choice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
            Self::Rewrite => "REWRITE",
        }
    }

    /// Parses a wire label; anything else is `None`.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "YES" => Some(Self::Yes),
            "NO" => Some(Self::No),
            "REWRITE" => Some(Self::Rewrite),
            _ => None,
        }
    }
}

/// One vote on one decision, held as the JSON document it travels as.
///
/// Synthesized votes are built with [`Vote::cast`] and the `with_*` setters.
/// Votes supplied by external agents are kept exactly as received, whatever
/// their shape, and the accessors report `None` for anything unreadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vote(Value);

impl Vote {
    /// Starts a vote for `persona`, snapshotting its current reputation.
    #[must_use]
    pub fn cast(persona: &Persona, choice: VoteChoice) -> Self {
        let mut fields = Map::new();
        fields.insert("persona_id".into(), persona.persona_id().as_str().into());
        fields.insert("name".into(), persona.name().into());
        fields.insert("reputation_before".into(), persona.reputation().into());
        fields.insert("vote".into(), choice.as_str().into());
        fields.insert("confidence".into(), Value::from(0.0_f64));
        fields.insert("reasons".into(), Value::Array(Vec::new()));
        fields.insert("red_flags".into(), Value::Array(Vec::new()));
        fields.insert("suggested_edits".into(), Value::Array(Vec::new()));
        Self(Value::Object(fields))
    }

    /// Sets the confidence, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_confidence(self, confidence: f64) -> Self {
        self.set("confidence", confidence.clamp(0.0, 1.0).into())
    }

    /// Appends a reason.
    #[must_use]
    pub fn with_reason(self, reason: impl Into<String>) -> Self {
        self.push("reasons", reason.into())
    }

    /// Replaces the red flags.
    #[must_use]
    pub fn with_red_flags(self, red_flags: Vec<String>) -> Self {
        self.set("red_flags", red_flags.into())
    }

    /// Appends a suggested edit.
    #[must_use]
    pub fn with_suggested_edit(self, edit: impl Into<String>) -> Self {
        self.push("suggested_edits", edit.into())
    }

    fn set(mut self, key: &str, value: Value) -> Self {
        if let Some(fields) = self.0.as_object_mut() {
            fields.insert(key.to_owned(), value);
        }
        self
    }

    fn push(mut self, key: &str, item: String) -> Self {
        if let Some(fields) = self.0.as_object_mut() {
            match fields.entry(key).or_insert_with(|| Value::Array(Vec::new())) {
                Value::Array(items) => items.push(item.into()),
                other => *other = Value::Array(vec![item.into()]),
            }
        }
        self
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    fn number(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    fn labels(&self, key: &str) -> Vec<&str> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Returns the voting persona's identifier.
    #[must_use]
    pub fn persona_id(&self) -> Option<&str> {
        self.text("persona_id")
    }

    /// Returns the voting persona's name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.text("name")
    }

    /// Returns the persona reputation at the time the vote was cast.
    #[must_use]
    pub fn reputation_before(&self) -> Option<f64> {
        self.number("reputation_before")
    }

    /// Returns the ballot choice, `None` when absent or unrecognized.
    #[must_use]
    pub fn choice(&self) -> Option<VoteChoice> {
        self.text("vote").and_then(VoteChoice::from_label)
    }

    /// Returns the confidence.
    #[must_use]
    pub fn confidence(&self) -> Option<f64> {
        self.number("confidence")
    }

    /// Returns the ordered reasons.
    #[must_use]
    pub fn reasons(&self) -> Vec<&str> {
        self.labels("reasons")
    }

    /// Returns the red flag codes.
    #[must_use]
    pub fn red_flags(&self) -> Vec<&str> {
        self.labels("red_flags")
    }

    /// Returns true when the vote carries the given flag.
    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.red_flags().contains(&flag)
    }

    /// Returns the ordered suggested edits.
    #[must_use]
    pub fn suggested_edits(&self) -> Vec<&str> {
        self.labels("suggested_edits")
    }

    /// Returns the vote document.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for Vote {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
