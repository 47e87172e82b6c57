//! Rule-based vote synthesis.
//!
//! Every persona on the panel is evaluated against the same rules, so a panel
//! votes in lock-step. Rules form a strict priority chain: conditions that
//! produce NO dominate the confirmation gate, which dominates the default YES.

use std::sync::Arc;

use guard_primitives::{PersonaSet, Vote, VoteChoice, flags};
use tracing::debug;

use crate::contracts::{Constraints, ProposedAction};
use crate::detector::KeywordDetector;
use crate::integrations::HardBlockDetector;

const NO_CONFIDENCE: f64 = 0.9;
const REWRITE_CONFIDENCE: f64 = 0.8;
const YES_CONFIDENCE: f64 = 0.72;

/// Reason attached to YES votes.
pub const REASON_ACCEPTABLE: &str = "Action acceptable";
/// Reason attached to NO and REWRITE votes.
pub const REASON_SAFEGUARDS: &str = "Action requires additional safeguards";
/// Edit suggested alongside REWRITE votes.
pub const CONFIRMATION_GATE_EDIT: &str = "Add explicit human confirmation gate before execution";

/// Verdict reached by the rule chain for one action.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Ruling {
    choice: VoteChoice,
    red_flags: Vec<String>,
}

/// Produces one vote per persona from action attributes.
#[derive(Clone)]
pub struct VoteSynthesizer {
    detector: Arc<dyn HardBlockDetector>,
}

impl VoteSynthesizer {
    /// Creates a synthesizer that screens action text with `detector`.
    #[must_use]
    pub fn new(detector: Arc<dyn HardBlockDetector>) -> Self {
        Self { detector }
    }

    /// Votes every persona of `panel` on `action`.
    #[must_use]
    pub fn synthesize(
        &self,
        panel: &PersonaSet,
        action: &ProposedAction,
        constraints: &Constraints,
    ) -> Vec<Vote> {
        let ruling = self.rule(action, constraints);
        debug!(
            persona_set_id = %panel.persona_set_id(),
            vote = ruling.choice.as_str(),
            red_flags = ?ruling.red_flags,
            "synthesized panel votes"
        );

        panel
            .personas()
            .iter()
            .map(|persona| {
                let vote = Vote::cast(persona, ruling.choice)
                    .with_red_flags(ruling.red_flags.clone());
                match ruling.choice {
                    VoteChoice::Yes => vote
                        .with_confidence(YES_CONFIDENCE)
                        .with_reason(REASON_ACCEPTABLE),
                    VoteChoice::No => vote
                        .with_confidence(NO_CONFIDENCE)
                        .with_reason(REASON_SAFEGUARDS),
                    VoteChoice::Rewrite => vote
                        .with_confidence(REWRITE_CONFIDENCE)
                        .with_reason(REASON_SAFEGUARDS)
                        .with_suggested_edit(CONFIRMATION_GATE_EDIT),
                }
            })
            .collect()
    }

    fn rule(&self, action: &ProposedAction, constraints: &Constraints) -> Ruling {
        let detected = self.detector.detect(&action.screening_text());
        let block_exfil = constraints.blocks_sensitive_exfiltration()
            && detected.iter().any(|flag| flag == flags::SENSITIVE_DATA);
        let must_confirm =
            constraints.requires_human_confirmation() && action.is_irreversible();

        let mut ruling = Ruling {
            choice: VoteChoice::Yes,
            red_flags: Vec::new(),
        };
        if action.is_high_risk() && action.is_irreversible() {
            ruling.choice = VoteChoice::No;
            ruling.red_flags.push(flags::HIGH_RISK_IRREVERSIBLE.to_owned());
        }
        if block_exfil {
            ruling.choice = VoteChoice::No;
            ruling.red_flags.push(flags::SENSITIVE_DATA.to_owned());
        } else if ruling.red_flags.is_empty() && must_confirm {
            ruling.choice = VoteChoice::Rewrite;
            ruling.red_flags.push(flags::HUMAN_CONFIRM_REQUIRED.to_owned());
        }
        ruling
    }
}

impl Default for VoteSynthesizer {
    fn default() -> Self {
        Self::new(Arc::new(KeywordDetector::new()))
    }
}

impl std::fmt::Debug for VoteSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoteSynthesizer").finish_non_exhaustive()
    }
}
