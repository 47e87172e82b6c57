//! Template-backed persona generation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use guard_primitives::{Persona, PersonaId, PersonaSet, PersonaSetId};
use tracing::debug;

use crate::integrations::{GenerationError, PanelRequest, PersonaGenerator};

const SECURITY_PACK: &[&str] = &[
    "Security Auditor",
    "Compliance Officer",
    "SRE On-Call",
    "Data Steward",
    "Risk Analyst",
    "Incident Commander",
    "Privacy Counsel",
];

const GENERAL_PACK: &[&str] = &[
    "Product Owner",
    "Operations Lead",
    "Quality Reviewer",
    "Customer Advocate",
    "Finance Controller",
];

/// Starting weight of generated personas.
pub const INITIAL_REPUTATION: f64 = 0.5;

/// Generates panels from fixed name packs.
#[derive(Debug, Clone)]
pub struct TemplatePersonaGenerator {
    packs: BTreeMap<String, Vec<String>>,
}

impl TemplatePersonaGenerator {
    /// Creates a generator with the `security` and `general` packs.
    #[must_use]
    pub fn new() -> Self {
        Self {
            packs: BTreeMap::new(),
        }
        .with_pack("security", SECURITY_PACK.iter().copied())
        .with_pack("general", GENERAL_PACK.iter().copied())
    }

    /// Registers (or replaces) a pack.
    #[must_use]
    pub fn with_pack<I, S>(mut self, name: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.packs
            .insert(name.into(), names.into_iter().map(Into::into).collect());
        self
    }
}

impl Default for TemplatePersonaGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersonaGenerator for TemplatePersonaGenerator {
    async fn generate(&self, request: &PanelRequest) -> Result<PersonaSet, GenerationError> {
        let pack = self
            .packs
            .get(&request.persona_pack)
            .ok_or_else(|| GenerationError::UnknownPack(request.persona_pack.clone()))?;
        if request.n_personas == 0 || request.n_personas > pack.len() {
            return Err(GenerationError::InvalidCount {
                requested: request.n_personas,
                available: pack.len(),
            });
        }

        let personas = pack
            .iter()
            .take(request.n_personas)
            .map(|name| Persona::new(PersonaId::generate(), name.as_str(), INITIAL_REPUTATION))
            .collect::<Result<Vec<_>, _>>()?;
        let panel = PersonaSet::new(PersonaSetId::generate(), personas);
        debug!(
            board_id = %request.board_id,
            persona_set_id = %panel.persona_set_id(),
            pack = %request.persona_pack,
            "generated persona panel"
        );
        Ok(panel)
    }
}
