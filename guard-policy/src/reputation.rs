//! Alignment-based reputation updates.

use std::collections::HashMap;

use guard_primitives::{Persona, Vote, VoteChoice};

use crate::decision::{AggregateOutcome, PersonaUpdate};
use crate::error::{GuardError, GuardResult};
use crate::integrations::{ReputationUpdate, ReputationUpdater};

/// Rewards personas whose vote matched the verdict and penalises the rest.
#[derive(Debug, Clone, Copy)]
pub struct AlignmentReputationUpdater {
    step: f64,
    floor: f64,
    ceiling: f64,
}

impl AlignmentReputationUpdater {
    /// Creates the updater with a step of 0.05 and bounds `[0.05, 1.0]`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            step: 0.05,
            floor: 0.05,
            ceiling: 1.0,
        }
    }

    /// Overrides the per-decision step.
    #[must_use]
    pub const fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }
}

impl Default for AlignmentReputationUpdater {
    fn default() -> Self {
        Self::new()
    }
}

fn aligned(choice: VoteChoice, outcome: &AggregateOutcome) -> bool {
    matches!(
        (choice, outcome),
        (VoteChoice::Yes, AggregateOutcome::Approve)
            | (VoteChoice::Rewrite, AggregateOutcome::Rewrite)
            | (VoteChoice::No, AggregateOutcome::Block)
    )
}

// Keeps stored weights free of accumulated binary noise.
fn round(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

impl ReputationUpdater for AlignmentReputationUpdater {
    fn update(
        &self,
        personas: &[Persona],
        votes: &[Vote],
        outcome: &AggregateOutcome,
    ) -> GuardResult<ReputationUpdate> {
        let choices: HashMap<&str, VoteChoice> = votes
            .iter()
            .filter_map(|vote| Some((vote.persona_id()?, vote.choice()?)))
            .collect();

        let mut result = ReputationUpdate::default();
        for persona in personas {
            let Some(&choice) = choices.get(persona.persona_id().as_str()) else {
                result.personas.push(persona.clone());
                continue;
            };
            let before = persona.reputation();
            let (delta, reason) = if aligned(choice, outcome) {
                (self.step, format!("vote {} aligned with {}", choice.as_str(), outcome.as_str()))
            } else {
                (-self.step, format!("vote {} diverged from {}", choice.as_str(), outcome.as_str()))
            };
            let after = round((before + delta).clamp(self.floor, self.ceiling));
            let updated = persona
                .with_reputation(after)
                .map_err(|err| GuardError::collaborator("reputation updater", err.to_string()))?;

            result.updates.push(PersonaUpdate {
                persona_id: persona.persona_id().clone(),
                name: persona.name().to_owned(),
                reputation_before: before,
                reputation_after: after,
                delta: round(after - before),
                reason,
            });
            result.personas.push(updated);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use guard_primitives::PersonaId;

    use super::*;

    fn persona(name: &str, reputation: f64) -> Persona {
        Persona::new(PersonaId::generate(), name, reputation).unwrap()
    }

    #[test]
    fn aligned_votes_gain_and_others_lose() {
        let auditor = persona("Security Auditor", 0.5);
        let steward = persona("Data Steward", 0.5);
        let votes = [
            Vote::cast(&auditor, VoteChoice::No),
            Vote::cast(&steward, VoteChoice::Yes),
        ];

        let update = AlignmentReputationUpdater::new()
            .update(&[auditor, steward], &votes, &AggregateOutcome::Block)
            .unwrap();

        assert_eq!(update.personas[0].reputation(), 0.55);
        assert_eq!(update.personas[1].reputation(), 0.45);
        assert_eq!(update.updates.len(), 2);
        assert_eq!(update.updates[1].delta, -0.05);
        assert_eq!(update.updates[0].reason, "vote NO aligned with BLOCK");
    }

    #[test]
    fn weights_stay_within_bounds() {
        let veteran = persona("Risk Analyst", 1.0);
        let novice = persona("SRE On-Call", 0.05);
        let votes = [
            Vote::cast(&veteran, VoteChoice::Yes),
            Vote::cast(&novice, VoteChoice::No),
        ];

        let update = AlignmentReputationUpdater::new()
            .update(&[veteran, novice], &votes, &AggregateOutcome::Approve)
            .unwrap();

        assert_eq!(update.personas[0].reputation(), 1.0);
        assert_eq!(update.personas[1].reputation(), 0.05);
        assert_eq!(update.updates[0].delta, 0.0);
    }

    #[test]
    fn personas_without_votes_are_unchanged() {
        let silent = persona("Privacy Counsel", 0.7);
        let update = AlignmentReputationUpdater::new()
            .update(std::slice::from_ref(&silent), &[], &AggregateOutcome::Block)
            .unwrap();
        assert_eq!(update.personas, vec![silent]);
        assert!(update.updates.is_empty());
    }

    #[test]
    fn unknown_verdicts_count_as_misaligned() {
        let analyst = persona("Risk Analyst", 0.5);
        let votes = [Vote::cast(&analyst, VoteChoice::No)];
        let update = AlignmentReputationUpdater::new()
            .update(&[analyst], &votes, &AggregateOutcome::Other("ESCALATE".into()))
            .unwrap();
        assert_eq!(update.personas[0].reputation(), 0.45);
    }
}
