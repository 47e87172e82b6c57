//! Configuration management for the action guard.

#![warn(missing_docs, clippy::pedantic)]

pub mod loader;
pub mod schema;

pub use loader::{
    DEFAULT_STATE_PATH, ENV_APPROVE_THRESHOLD, ENV_LOG, ENV_PERSONA_COUNT, ENV_PERSONA_PACK,
    ENV_STATE_PATH, resolve_state_path,
};
pub use schema::{GuardConfig, WEIGHTED_APPROVAL_VOTE};
