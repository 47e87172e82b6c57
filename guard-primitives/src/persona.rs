//! Persona panels: weighted evaluator identities and their immutable versions.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::{PersonaId, PersonaSetId};

const MAX_NAME_LEN: usize = 96;

/// Weighted evaluator identity casting one vote per decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    persona_id: PersonaId,
    name: String,
    reputation: f64,
}

impl Persona {
    /// Creates a persona after validating its name and weight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPersona`] when the name is empty or too long, or
    /// the reputation is not a finite, non-negative number.
    pub fn new(persona_id: PersonaId, name: impl Into<String>, reputation: f64) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidPersona {
                reason: "persona name cannot be empty".into(),
            });
        }
        if name.len() > MAX_NAME_LEN {
            return Err(Error::InvalidPersona {
                reason: format!("persona name length must be <= {MAX_NAME_LEN}"),
            });
        }
        validate_reputation(reputation)?;
        Ok(Self {
            persona_id,
            name,
            reputation,
        })
    }

    /// Returns the persona identifier.
    #[must_use]
    pub fn persona_id(&self) -> &PersonaId {
        &self.persona_id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current reputation weight.
    #[must_use]
    pub fn reputation(&self) -> f64 {
        self.reputation
    }

    /// Returns a copy of this persona carrying a new reputation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPersona`] if the weight is not finite or negative.
    pub fn with_reputation(&self, reputation: f64) -> Result<Self> {
        validate_reputation(reputation)?;
        Ok(Self {
            reputation,
            ..self.clone()
        })
    }
}

fn validate_reputation(reputation: f64) -> Result<()> {
    if !reputation.is_finite() || reputation < 0.0 {
        return Err(Error::InvalidPersona {
            reason: format!("reputation must be a finite non-negative number, got {reputation}"),
        });
    }
    Ok(())
}

/// Link from an evolved panel back to the version it was derived from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    /// Panel this version evolved from, if any.
    pub parent_persona_set_id: Option<PersonaSetId>,
}

/// Immutable, versioned collection of personas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonaSet {
    persona_set_id: PersonaSetId,
    personas: Vec<Persona>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lineage: Option<Lineage>,
}

impl PersonaSet {
    /// Creates a root panel with no lineage.
    #[must_use]
    pub fn new(persona_set_id: PersonaSetId, personas: Vec<Persona>) -> Self {
        Self {
            persona_set_id,
            personas,
            updated_at: None,
            lineage: None,
        }
    }

    /// Derives the successor panel carrying updated personas.
    ///
    /// The successor receives a fresh identifier and points back at `self`;
    /// `self` is left untouched.
    #[must_use]
    pub fn evolve(&self, personas: Vec<Persona>, updated_at: impl Into<String>) -> Self {
        Self {
            persona_set_id: PersonaSetId::generate(),
            personas,
            updated_at: Some(updated_at.into()),
            lineage: Some(Lineage {
                parent_persona_set_id: Some(self.persona_set_id.clone()),
            }),
        }
    }

    /// Returns the panel identifier.
    #[must_use]
    pub fn persona_set_id(&self) -> &PersonaSetId {
        &self.persona_set_id
    }

    /// Returns the ordered personas.
    #[must_use]
    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    /// Returns when this version was produced, for evolved panels.
    #[must_use]
    pub fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }

    /// Returns the lineage of evolved panels.
    #[must_use]
    pub fn lineage(&self) -> Option<&Lineage> {
        self.lineage.as_ref()
    }

    /// Returns the parent panel identifier, if this version evolved from one.
    #[must_use]
    pub fn parent(&self) -> Option<&PersonaSetId> {
        self.lineage
            .as_ref()
            .and_then(|lineage| lineage.parent_persona_set_id.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona(name: &str) -> Persona {
        Persona::new(PersonaId::generate(), name, 0.5).expect("persona")
    }

    #[test]
    fn persona_rejects_bad_input() {
        assert!(Persona::new(PersonaId::generate(), " ", 0.5).is_err());
        assert!(Persona::new(PersonaId::generate(), "auditor", f64::NAN).is_err());
        assert!(Persona::new(PersonaId::generate(), "auditor", -0.1).is_err());
    }

    #[test]
    fn evolve_links_back_without_mutating_parent() {
        let root = PersonaSet::new(PersonaSetId::from("root"), vec![persona("auditor")]);
        let updated = root.personas()[0].with_reputation(0.55).unwrap();
        let next = root.evolve(vec![updated], "2026-01-01T00:00:00.000Z");

        assert_ne!(next.persona_set_id(), root.persona_set_id());
        assert_eq!(next.parent(), Some(root.persona_set_id()));
        assert!(root.lineage().is_none());
        assert!((root.personas()[0].reputation() - 0.5).abs() < f64::EPSILON);
        assert!((next.personas()[0].reputation() - 0.55).abs() < f64::EPSILON);
    }

    #[test]
    fn serializes_lineage_shape() {
        let root = PersonaSet::new(PersonaSetId::from("root"), vec![persona("auditor")]);
        let next = root.evolve(root.personas().to_vec(), "t");
        let value = serde_json::to_value(&next).unwrap();
        assert_eq!(value["lineage"]["parent_persona_set_id"], "root");
        assert_eq!(value["updated_at"], "t");
        assert!(serde_json::to_value(&root).unwrap().get("lineage").is_none());
    }
}
