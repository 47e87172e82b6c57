//! Strongly typed configuration schema.

use std::path::PathBuf;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Aggregation method identifier sent to the aggregator.
pub const WEIGHTED_APPROVAL_VOTE: &str = "WEIGHTED_APPROVAL_VOTE";

const fn default_approve_threshold() -> f64 {
    0.7
}

const fn default_persona_count() -> usize {
    5
}

fn default_persona_pack() -> String {
    "security".into()
}

fn default_log_filter() -> String {
    "info".into()
}

/// Runtime configuration for the guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    /// Share of weighted YES votes needed to approve an action.
    #[serde(default = "default_approve_threshold")]
    pub approve_threshold: f64,
    /// Panel size requested when a board has no persona set yet.
    #[serde(default = "default_persona_count")]
    pub persona_count: usize,
    /// Template pack used when generating a new panel.
    #[serde(default = "default_persona_pack")]
    pub persona_pack: String,
    /// Location of the artifact journal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_path: Option<PathBuf>,
    /// `tracing` filter directive used when no `RUST_LOG` is set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            approve_threshold: default_approve_threshold(),
            persona_count: default_persona_count(),
            persona_pack: default_persona_pack(),
            state_path: None,
            log_filter: default_log_filter(),
        }
    }
}

impl GuardConfig {
    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Fails when the threshold is outside `(0, 1]`, the persona count is zero,
    /// or the persona pack is blank.
    pub fn validate(&self) -> Result<()> {
        if !(self.approve_threshold > 0.0 && self.approve_threshold <= 1.0) {
            bail!(
                "approve_threshold must be in (0, 1], got {}",
                self.approve_threshold
            );
        }
        if self.persona_count == 0 {
            bail!("persona_count must be at least 1");
        }
        if self.persona_pack.trim().is_empty() {
            bail!("persona_pack cannot be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_guard_policy() {
        let config = GuardConfig::default();
        assert!((config.approve_threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.persona_count, 5);
        assert_eq!(config.persona_pack, "security");
        config.validate().unwrap();
    }

    #[test]
    fn partial_document_fills_defaults() {
        let config: GuardConfig = serde_json::from_str(r#"{"persona_count": 3}"#).unwrap();
        assert_eq!(config.persona_count, 3);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let config = GuardConfig {
            approve_threshold: 1.5,
            ..GuardConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GuardConfig {
            persona_count: 0,
            ..GuardConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<GuardConfig>(r#"{"threshold": 0.5}"#).is_err());
    }
}
