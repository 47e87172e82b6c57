//! Core shared types for the action guard.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod persona;
mod vote;

/// Error type and result alias shared across the guard crates.
pub use error::{Error, Result};
/// Identifiers for boards, panels, personas, and decisions.
pub use ids::{BoardId, DecisionId, PersonaId, PersonaSetId};
/// Persona panels and their lineage.
pub use persona::{Lineage, Persona, PersonaSet};
/// Votes and red flag codes.
pub use vote::{Vote, VoteChoice, flags};
