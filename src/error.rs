//! Error types for state persistence.

use thiserror::Error;

/// Why a persisted state stream could not be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorruptionKind {
    #[error("format version marker {found:#06x} does not match {expected:#06x}")]
    VersionMismatch { expected: u16, found: u16 },

    #[error("unknown type tag {0:#04x}")]
    UnknownTag(u8),

    #[error("back-reference index {index} outside cache of {len} entries")]
    CacheIndexOutOfRange { index: u16, len: usize },

    #[error("back-reference index {0} names a value of the wrong kind")]
    CacheKindMismatch(u16),

    #[error("stream ended early")]
    Truncated,

    #[error("{0} unread bytes after the root value")]
    TrailingBytes(usize),

    #[error("invalid utf-8 in string payload")]
    InvalidUtf8,

    #[error("invalid character scalar {0:#x}")]
    InvalidChar(u32),

    #[error("timestamp out of range")]
    InvalidTimestamp,

    #[error("invalid length prefix")]
    InvalidLength,

    #[error("unknown primitive array element kind {0}")]
    UnknownArrayKind(u8),

    #[error("unexpected shape: {0}")]
    UnexpectedShape(&'static str),

    #[error("nesting exceeds {0} levels")]
    TooDeep(usize),

    #[error("no text adapter registered for type `{0}`")]
    MissingAdapter(String),

    #[error("text adapter for `{type_name}` rejected `{text}`")]
    AdapterRejected { type_name: String, text: String },

    #[error("field is not valid base64")]
    Base64,

    #[error("integrity check failed")]
    IntegrityCheckFailed,

    #[error("state length {len} exceeds limit {limit}")]
    FieldTooLarge { len: usize, limit: usize },

    #[error("invalid state field count `{0}`")]
    InvalidFieldCount(String),

    #[error("state field `{0}` is missing")]
    MissingStateChunk(String),
}

/// Errors raised while encoding, decoding or applying persisted state.
#[derive(Debug, Error)]
pub enum StateError {
    /// The inbound blob cannot be trusted for any fragment.
    #[error("state corrupted: {0}")]
    Corrupted(#[from] CorruptionKind),

    /// A value has a shape the codec cannot write. This is a defect in the
    /// state a node stored, not an input condition.
    #[error("value cannot be encoded: {0}")]
    Unencodable(String),

    /// The client posted an interaction the previous response never offered.
    #[error("invalid interaction for `{target}`")]
    InvalidInteraction {
        target: String,
        argument: Option<String>,
    },

    /// The injected opaque-object serializer failed.
    #[error("opaque serializer error: {0}")]
    Serializer(#[from] serde_json::Error),
}

impl StateError {
    /// Whether the error came from untrusted input rather than server code.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            StateError::Corrupted(_) | StateError::InvalidInteraction { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StateError>;
