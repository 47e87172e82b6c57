//! Action guard facade.
//!
//! Bundles the guard crates behind feature flags. With the default features,
//! `ActionGuard` is ready to evaluate requests against any `ArtifactStore`.

#![warn(missing_docs, clippy::pedantic)]

/// Identifiers, personas, panels and votes.
pub use guard_primitives as primitives;

/// Decision pipeline (enabled by `policy` feature).
#[cfg(feature = "policy")]
pub use guard_policy as policy;

/// Artifact stores and idempotency keys (enabled by `store` feature).
#[cfg(feature = "store")]
pub use guard_store as store;

/// Configuration loading (enabled by `config` feature).
#[cfg(feature = "config")]
pub use guard_config as config;

/// Tracing setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use guard_telemetry as telemetry;

#[cfg(feature = "policy")]
pub use guard_policy::{ActionGuard, GuardResponse};
