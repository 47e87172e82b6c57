//! Identifier types for boards, panels, personas, and decisions.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// Namespace under which decisions and persona panels are stored.
///
/// The identifier is kept exactly as submitted; only blank values are rejected.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BoardId(String);

impl BoardId {
    /// Creates a board identifier after checking it is not blank.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBoardId`] if the identifier is empty once trimmed.
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidBoardId {
                id,
                reason: "board id cannot be empty".into(),
            });
        }
        Ok(Self(id))
    }

    /// Returns the board identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BoardId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BoardId> for String {
    fn from(value: BoardId) -> Self {
        value.0
    }
}

impl Display for BoardId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of an immutable persona panel version.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonaSetId(String);

impl PersonaSetId {
    /// Generates a fresh random panel identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PersonaSetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PersonaSetId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl Display for PersonaSetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a single persona within a panel.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonaId(String);

impl PersonaId {
    /// Generates a fresh random persona identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PersonaId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PersonaId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl Display for PersonaId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Globally unique identifier of a recorded guard decision.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionId(Uuid);

impl DecisionId {
    /// Generates a random decision identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl Display for DecisionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for DecisionId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for DecisionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::parse_str(s).map_err(Error::from)?;
        Ok(Self(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_decision_id() {
        let id = DecisionId::random();
        let parsed = id.to_string().parse::<DecisionId>().expect("parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn board_id_rejects_blank() {
        assert!(BoardId::new("   ").is_err());
        let err = serde_json::from_str::<BoardId>("\"\"").expect_err("blank board");
        assert!(err.to_string().contains("board id cannot be empty"));
    }

    #[test]
    fn board_id_keeps_original_text() {
        let id = BoardId::new(" ops ").unwrap();
        assert_eq!(id.as_str(), " ops ");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\" ops \"");
    }

    #[test]
    fn generated_panel_ids_differ() {
        assert_ne!(PersonaSetId::generate(), PersonaSetId::generate());
    }
}
