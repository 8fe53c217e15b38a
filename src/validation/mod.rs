//! Replay validation: the set of interactions a response offered, checked
//! against what the next request claims to have done.

use sha2::{Digest, Sha256};

use crate::codec::{PrimitiveArray, Value};
use crate::error::{CorruptionKind, Result, StateError};

/// Combined hash of a target identifier and optional argument.
///
/// Each part hashes to the leading four bytes of its SHA-256 digest; the
/// argument contributes 0 when absent.
pub fn interaction_hash(target: &str, argument: Option<&str>) -> i32 {
    part_hash(target) ^ argument.map_or(0, part_hash)
}

fn part_hash(text: &str) -> i32 {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    i32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Interactions registered while rendering one response.
///
/// Membership is a linear scan; pages register a few dozen entries at most.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayRegistry {
    hashes: Vec<i32>,
}

impl ReplayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the response offers `(target, argument)`. Returns `false`
    /// if it was already registered.
    pub fn register(&mut self, target: &str, argument: Option<&str>) -> bool {
        let hash = interaction_hash(target, argument);
        if self.hashes.contains(&hash) {
            return false;
        }
        self.hashes.push(hash);
        true
    }

    pub fn contains(&self, target: &str, argument: Option<&str>) -> bool {
        self.hashes.contains(&interaction_hash(target, argument))
    }

    /// Fails with [`StateError::InvalidInteraction`] unless the pair was
    /// registered. Validation does not consume the entry.
    pub fn validate(&self, target: &str, argument: Option<&str>) -> Result<()> {
        if self.contains(target, argument) {
            return Ok(());
        }
        tracing::warn!(target_id = %target, argument = ?argument, "Rejected unregistered interaction");
        Err(StateError::InvalidInteraction {
            target: target.to_string(),
            argument: argument.map(str::to_string),
        })
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn clear(&mut self) {
        self.hashes.clear();
    }

    /// Persisted as a packed `i32` array.
    pub fn to_value(&self) -> Value {
        Value::PrimitiveArray(PrimitiveArray::Int32(self.hashes.clone()))
    }

    /// Inverse of [`to_value`](Self::to_value). `Null` reads as empty.
    pub fn from_value(value: Value) -> std::result::Result<Self, CorruptionKind> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::PrimitiveArray(PrimitiveArray::Int32(hashes)) => Ok(Self { hashes }),
            _ => Err(CorruptionKind::UnexpectedShape(
                "validation registry must be an int32 array",
            )),
        }
    }
}
