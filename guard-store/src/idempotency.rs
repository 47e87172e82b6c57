//! Deterministic idempotency keys over the logically relevant request fields.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::StoreResult;

const DOMAIN: &[u8] = b"action-guard/idempotency/v1\n";

/// Hex-encoded SHA-256 fingerprint of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Derives the key for any serializable set of fields.
    ///
    /// Object keys are sorted recursively before hashing, so field order never
    /// changes the result.
    ///
    /// # Errors
    ///
    /// Returns a serialization error when `fields` cannot be represented as JSON.
    pub fn derive<T: Serialize + ?Sized>(fields: &T) -> StoreResult<Self> {
        let value = serde_json::to_value(fields)?;
        let mut canonical = String::new();
        write_canonical(&value, &mut canonical)?;

        let mut hasher = Sha256::new();
        hasher.update(DOMAIN);
        hasher.update(canonical.as_bytes());
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IdempotencyKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn write_canonical(value: &Value, out: &mut String) -> StoreResult<()> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(item, out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}
