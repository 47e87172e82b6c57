//! Board-scoped artifact storage for guard decisions and persona panels.

#![warn(missing_docs, clippy::pedantic)]

mod error;
pub mod idempotency;
pub mod journal;
pub mod record;
pub mod store;
pub mod volatile;

pub use error::{StoreError, StoreResult};
pub use idempotency::IdempotencyKey;
pub use journal::FileArtifactStore;
pub use record::{ArtifactKind, ArtifactRecord, ArtifactRecordBuilder, ArtifactRef};
pub use store::ArtifactStore;
pub use volatile::MemoryArtifactStore;
