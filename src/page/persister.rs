//! Turning a value graph into a hidden-field string and back.

use std::sync::Arc;

use base64::engine::general_purpose;
use base64::Engine as _;

use crate::codec::{StateFormatter, Value};
use crate::error::{CorruptionKind, Result};
use crate::page::protect::{NoProtection, StateProtector};

/// Default cap on inbound state, in characters, summed over all chunks.
pub const DEFAULT_MAX_STATE_LENGTH: usize = 1 << 20;

/// Encodes values as `base64(protect(serialize(value)))`.
///
/// Holds only immutable settings; one instance is shared by every request.
#[derive(Debug, Clone)]
pub struct StatePersister {
    formatter: StateFormatter,
    protector: Arc<dyn StateProtector>,
    max_state_length: usize,
    max_field_length: usize,
}

impl Default for StatePersister {
    fn default() -> Self {
        Self::new(StateFormatter::new())
    }
}

impl StatePersister {
    pub fn new(formatter: StateFormatter) -> Self {
        Self {
            formatter,
            protector: Arc::new(NoProtection),
            max_state_length: DEFAULT_MAX_STATE_LENGTH,
            max_field_length: 0,
        }
    }

    pub fn with_protector(mut self, protector: Arc<dyn StateProtector>) -> Self {
        self.protector = protector;
        self
    }

    /// Reject inbound state longer than `limit` characters.
    pub fn with_max_state_length(mut self, limit: usize) -> Self {
        self.max_state_length = limit;
        self
    }

    /// Split outbound state into hidden fields of at most `limit` characters.
    /// Zero keeps it in one field.
    pub fn with_max_field_length(mut self, limit: usize) -> Self {
        self.max_field_length = limit;
        self
    }

    pub fn formatter(&self) -> &StateFormatter {
        &self.formatter
    }

    pub fn max_state_length(&self) -> usize {
        self.max_state_length
    }

    pub fn max_field_length(&self) -> usize {
        self.max_field_length
    }

    pub fn encode(&self, value: &Value) -> Result<String> {
        self.encode_for(value, None)
    }

    pub fn decode(&self, field: &str) -> Result<Value> {
        self.decode_for(field, None)
    }

    /// Encode with `user_key` bound into the protection step.
    pub fn encode_for(&self, value: &Value, user_key: Option<&str>) -> Result<String> {
        let bytes = self.formatter.serialize(value)?;
        let sealed = self.protector.protect(bytes, user_key);
        Ok(general_purpose::STANDARD.encode(sealed))
    }

    /// Decode a field produced by [`encode_for`](Self::encode_for) with the
    /// same `user_key`.
    pub fn decode_for(&self, field: &str, user_key: Option<&str>) -> Result<Value> {
        if field.len() > self.max_state_length {
            tracing::warn!(
                len = field.len(),
                limit = self.max_state_length,
                "Rejecting oversized state field"
            );
            return Err(CorruptionKind::FieldTooLarge {
                len: field.len(),
                limit: self.max_state_length,
            }
            .into());
        }
        let sealed = general_purpose::STANDARD
            .decode(field.trim())
            .map_err(|_| CorruptionKind::Base64)?;
        let bytes = self.protector.unprotect(sealed, user_key)?;
        self.formatter.deserialize(&bytes)
    }

    /// Cut an encoded field into the pieces to render. Always returns at
    /// least one piece.
    pub fn split(&self, field: &str) -> Vec<String> {
        if self.max_field_length == 0 || field.len() <= self.max_field_length {
            return vec![field.to_string()];
        }
        // Encoded fields are base64, so every byte is a char boundary.
        field
            .as_bytes()
            .chunks(self.max_field_length)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect()
    }
}
