//! Observability utilities for the action guard.

#![warn(missing_docs, clippy::pedantic)]

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Settings for the process-wide `tracing` subscriber.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    filter: String,
    with_target: bool,
}

impl TelemetryConfig {
    /// Creates settings using `filter` as the fallback directive.
    #[must_use]
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            with_target: false,
        }
    }

    /// Shows the event target (module path) in each line.
    #[must_use]
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    /// Returns the fallback filter directive.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.filter)
            .map_err(|err| anyhow!("invalid log filter `{}`: {err}", self.filter))
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

/// Installs the global `fmt` subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over the configured filter. Returns `Ok(false)`
/// when a global subscriber was already installed.
///
/// # Errors
///
/// Fails when the filter directive cannot be parsed.
pub fn init(config: &TelemetryConfig) -> Result<bool> {
    let filter = config.env_filter()?;
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(filter = config.filter(), "tracing subscriber installed");
    }
    Ok(installed)
}
