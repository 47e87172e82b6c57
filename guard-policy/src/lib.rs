//! Action guard decision pipeline.
//!
//! [`ActionGuard`] validates a proposed agent action, collects votes from a
//! persona panel (or an external agent), aggregates them into a verdict and
//! records the decision so repeated submissions replay the same answer.

#![warn(missing_docs, clippy::pedantic)]

pub mod aggregate;
pub mod contracts;
pub mod decision;
pub mod detector;
mod error;
pub mod generator;
pub mod integrations;
mod orchestrator;
pub mod repository;
pub mod reputation;
pub mod synthesis;

pub use aggregate::WeightedApprovalAggregator;
pub use contracts::{Constraints, GuardRequest, ProposedAction, RiskLevel, VoteSource, validate};
pub use decision::{
    AggregateOutcome, AggregationResult, AggregationSummary, BoardWrite, Decision, GuardDecision,
    GuardResponse, PersonaUpdate,
};
pub use detector::KeywordDetector;
pub use error::{ErrorBody, ErrorCode, ErrorResponse, GuardError, GuardResult};
pub use generator::TemplatePersonaGenerator;
pub use integrations::{
    AggregationPolicy, Aggregator, GenerationError, HardBlockDetector, PanelRequest,
    PersonaGenerator, ReputationUpdate, ReputationUpdater, TaskContext,
};
pub use orchestrator::ActionGuard;
pub use repository::BoardLedger;
pub use reputation::AlignmentReputationUpdater;
pub use synthesis::VoteSynthesizer;
