//! Configuration loader: optional JSON file plus environment overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::schema::GuardConfig;

/// Overrides [`GuardConfig::state_path`].
pub const ENV_STATE_PATH: &str = "ACTION_GUARD_STATE_PATH";
/// Overrides [`GuardConfig::approve_threshold`].
pub const ENV_APPROVE_THRESHOLD: &str = "ACTION_GUARD_APPROVE_THRESHOLD";
/// Overrides [`GuardConfig::persona_count`].
pub const ENV_PERSONA_COUNT: &str = "ACTION_GUARD_PERSONA_COUNT";
/// Overrides [`GuardConfig::persona_pack`].
pub const ENV_PERSONA_PACK: &str = "ACTION_GUARD_PERSONA_PACK";
/// Overrides [`GuardConfig::log_filter`].
pub const ENV_LOG: &str = "ACTION_GUARD_LOG";

/// Journal location used when nothing else is configured.
pub const DEFAULT_STATE_PATH: &str = ".action-guard/state.jsonl";

impl GuardConfig {
    /// Loads configuration from an optional file and the process environment.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed, an override cannot be
    /// parsed, or the result does not validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Same as [`GuardConfig::load`] with a caller-supplied environment lookup.
    ///
    /// # Errors
    ///
    /// See [`GuardConfig::load`].
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_overrides(lookup)?;
        config.validate()?;
        debug!(?config, "guard configuration loaded");
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_STATE_PATH).filter(|v| !v.trim().is_empty()) {
            self.state_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(ENV_APPROVE_THRESHOLD) {
            self.approve_threshold = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_APPROVE_THRESHOLD}={raw} is not a number"))?;
        }
        if let Some(raw) = lookup(ENV_PERSONA_COUNT) {
            self.persona_count = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_PERSONA_COUNT}={raw} is not a count"))?;
        }
        if let Some(pack) = lookup(ENV_PERSONA_PACK) {
            self.persona_pack = pack;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }
        Ok(())
    }
}

/// Resolves where this invocation's artifact journal lives.
///
/// An explicit path wins, then the configured one, then
/// [`DEFAULT_STATE_PATH`].
#[must_use]
pub fn resolve_state_path(explicit: Option<&Path>, config: &GuardConfig) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| config.state_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use uuid::Uuid;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn environment_overrides_file() {
        let path = std::env::temp_dir().join(format!("guard-config-{}.json", Uuid::new_v4()));
        std::fs::write(&path, r#"{"approve_threshold": 0.6, "persona_pack": "general"}"#).unwrap();

        let config = GuardConfig::load_with(
            Some(&path),
            env(&[(ENV_APPROVE_THRESHOLD, "0.9"), (ENV_STATE_PATH, "/tmp/g.jsonl")]),
        )
        .unwrap();

        assert!((config.approve_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(config.persona_pack, "general");
        assert_eq!(config.state_path, Some(PathBuf::from("/tmp/g.jsonl")));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn invalid_override_fails() {
        assert!(GuardConfig::load_with(None, env(&[(ENV_PERSONA_COUNT, "many")])).is_err());
        assert!(GuardConfig::load_with(None, env(&[(ENV_PERSONA_COUNT, "0")])).is_err());
    }

    #[test]
    fn state_path_resolution_order() {
        let mut config = GuardConfig::default();
        assert_eq!(
            resolve_state_path(None, &config),
            PathBuf::from(DEFAULT_STATE_PATH)
        );

        config.state_path = Some(PathBuf::from("configured.jsonl"));
        assert_eq!(
            resolve_state_path(None, &config),
            PathBuf::from("configured.jsonl")
        );
        assert_eq!(
            resolve_state_path(Some(Path::new("explicit.jsonl")), &config),
            PathBuf::from("explicit.jsonl")
        );
    }
}
