//! Command-line front end for the action guard.
//!
//! Reads one request as JSON, evaluates it against the on-disk journal and
//! prints the response. The exit status is non-zero for error responses.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use guard_config::{GuardConfig, resolve_state_path};
use guard_policy::ActionGuard;
use guard_store::FileArtifactStore;
use guard_telemetry::TelemetryConfig;
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing::info;

/// Evaluate a proposed agent action.
#[derive(Parser)]
#[command(name = "guard-cli", version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Artifact journal location (overrides config and environment)
    #[arg(short, long)]
    state: Option<PathBuf>,

    /// Show event targets in log lines
    #[arg(long)]
    log_targets: bool,

    /// Request file; stdin when omitted or `-`
    input: Option<PathBuf>,
}

async fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading request {}", path.display())),
        _ => {
            let mut raw = String::new();
            tokio::io::stdin()
                .read_to_string(&mut raw)
                .await
                .context("reading request from stdin")?;
            Ok(raw)
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = GuardConfig::load(cli.config.as_deref())?;
    guard_telemetry::init(
        &TelemetryConfig::new(config.log_filter.clone()).with_target(cli.log_targets),
    )?;

    let state_path = resolve_state_path(cli.state.as_deref(), &config);
    let store = FileArtifactStore::open(&state_path)
        .await
        .with_context(|| format!("opening journal {}", state_path.display()))?;
    info!(path = %state_path.display(), "journal opened");

    let raw = read_input(cli.input.as_deref()).await?;
    let request: Value = serde_json::from_str(&raw).context("request is not valid JSON")?;

    let guard = ActionGuard::new(Arc::new(store)).with_config(config);
    let response = guard.handle(&request).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(if response.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
