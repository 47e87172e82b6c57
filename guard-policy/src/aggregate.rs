//! Reputation-weighted approval voting.

use guard_primitives::{Vote, VoteChoice, flags};

use crate::decision::{AggregateOutcome, AggregationResult, AggregationSummary};
use crate::error::{GuardError, GuardResult};
use crate::integrations::{AggregationPolicy, Aggregator};

/// Flags that block regardless of tallies.
const HARD_BLOCK_FLAGS: &[&str] = &[flags::SENSITIVE_DATA, flags::HIGH_RISK_IRREVERSIBLE];

/// Weight of a vote that states no reputation.
const UNSTATED_WEIGHT: f64 = 1.0;

/// Each vote weighs its voter's reputation at the time of voting.
///
/// Votes without a recognizable choice are not tallied.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedApprovalAggregator;

impl WeightedApprovalAggregator {
    /// Creates the aggregator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn weight(vote: &Vote) -> f64 {
    let weight = vote.reputation_before().unwrap_or(UNSTATED_WEIGHT);
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

impl Aggregator for WeightedApprovalAggregator {
    fn aggregate(&self, votes: &[Vote], policy: &AggregationPolicy) -> GuardResult<AggregationResult> {
        let threshold = policy.approve_threshold;
        if !(threshold.is_finite() && threshold > 0.0 && threshold <= 1.0) {
            return Err(GuardError::collaborator(
                "aggregator",
                format!("approve_threshold must be in (0, 1], got {threshold}"),
            ));
        }

        let (mut yes, mut no, mut rewrite) = (0.0_f64, 0.0_f64, 0.0_f64);
        for vote in votes {
            let tally = match vote.choice() {
                Some(VoteChoice::Yes) => &mut yes,
                Some(VoteChoice::No) => &mut no,
                Some(VoteChoice::Rewrite) => &mut rewrite,
                None => continue,
            };
            *tally += weight(vote);
        }
        let hard_block = votes
            .iter()
            .any(|vote| HARD_BLOCK_FLAGS.iter().any(|flag| vote.has_flag(flag)));
        let total = yes + no + rewrite;

        let (outcome, rationale) = if hard_block {
            (AggregateOutcome::Block, "hard-block flag raised by at least one vote".to_owned())
        } else if total <= 0.0 {
            (AggregateOutcome::Block, "no weighted votes cast".to_owned())
        } else if yes / total >= threshold {
            (
                AggregateOutcome::Approve,
                format!("weighted approval {:.3} meets threshold {threshold}", yes / total),
            )
        } else if rewrite >= no {
            (
                AggregateOutcome::Rewrite,
                format!("approval below threshold {threshold}; rewrite outweighs rejection"),
            )
        } else {
            (
                AggregateOutcome::Block,
                format!("approval below threshold {threshold}; rejection outweighs rewrite"),
            )
        };

        Ok(AggregationResult::new(
            AggregationSummary {
                method: policy.method.clone(),
                weighted_yes: yes,
                weighted_no: no,
                weighted_rewrite: rewrite,
                hard_block,
                rationale,
            },
            outcome,
        ))
    }
}

#[cfg(test)]
mod tests {
    use guard_primitives::{Persona, PersonaId};
    use serde_json::json;

    use super::*;

    fn vote(reputation: f64, choice: VoteChoice) -> Vote {
        let persona = Persona::new(PersonaId::generate(), "Reviewer", reputation).unwrap();
        Vote::cast(&persona, choice)
    }

    fn run(votes: &[Vote]) -> AggregationResult {
        WeightedApprovalAggregator::new()
            .aggregate(votes, &AggregationPolicy::default())
            .unwrap()
    }

    #[test]
    fn approves_above_threshold() {
        let result = run(&[
            vote(0.5, VoteChoice::Yes),
            vote(0.5, VoteChoice::Yes),
            vote(0.2, VoteChoice::No),
        ]);
        assert_eq!(result.final_decision(), &AggregateOutcome::Approve);
        assert!((result.summary().weighted_yes - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rewrite_wins_ties_against_rejection() {
        let result = run(&[
            vote(0.5, VoteChoice::Rewrite),
            vote(0.5, VoteChoice::No),
            vote(0.5, VoteChoice::Yes),
        ]);
        assert_eq!(result.final_decision(), &AggregateOutcome::Rewrite);

        let result = run(&[vote(0.5, VoteChoice::Rewrite), vote(0.9, VoteChoice::No)]);
        assert_eq!(result.final_decision(), &AggregateOutcome::Block);
    }

    #[test]
    fn hard_block_flags_override_approval() {
        let flagged = vote(0.1, VoteChoice::Yes).with_red_flags(vec![flags::SENSITIVE_DATA.into()]);
        let result = run(&[vote(1.0, VoteChoice::Yes), flagged]);
        assert!(result.summary().hard_block);
        assert_eq!(result.final_decision(), &AggregateOutcome::Block);
    }

    #[test]
    fn empty_or_weightless_votes_block() {
        assert_eq!(run(&[]).final_decision(), &AggregateOutcome::Block);
        assert_eq!(
            run(&[vote(0.0, VoteChoice::Yes)]).final_decision(),
            &AggregateOutcome::Block
        );
    }

    #[test]
    fn unreadable_votes_carry_no_weight() {
        let supplied = [
            Vote::from(json!({"persona_id": "a", "vote": "YES"})),
            Vote::from(json!({"persona_id": "b", "opinion": "looks fine"})),
            Vote::from(json!({"persona_id": "c", "vote": "MAYBE", "reputation_before": 5.0})),
        ];
        let result = run(&supplied);
        assert_eq!(result.final_decision(), &AggregateOutcome::Approve);
        assert!((result.summary().weighted_yes - 1.0).abs() < 1e-9);
        assert!(result.summary().weighted_no.abs() < 1e-9);

        let result = run(&[Vote::from(json!("YES"))]);
        assert_eq!(result.final_decision(), &AggregateOutcome::Block);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let err = WeightedApprovalAggregator::new()
            .aggregate(&[], &AggregationPolicy::weighted_approval(1.5))
            .unwrap_err();
        assert!(matches!(err, GuardError::Collaborator { collaborator: "aggregator", .. }));
    }
}
