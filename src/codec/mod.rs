//! Compact, self-describing binary encoding for state value graphs.
//!
//! Wire layout: a two-byte format marker followed by one tag-prefixed value.
//! There is no forward compatibility: the reader of a blob must be the same
//! codec version that wrote it.

pub mod adapter;
pub mod cache;
mod reader;
pub mod tag;
pub mod value;
mod writer;

pub use adapter::{AdapterRegistry, SerdeTextAdapter, TextAdapter};
pub use value::{
    EnumValue, ObjectArray, OpaqueValue, PrimitiveArray, TypeName, Value, ValueMap,
};

use crate::error::{CorruptionKind, Result};
use reader::GraphReader;
use writer::GraphWriter;

/// Leading marker of every stream, little-endian on the wire (`FF 01`).
pub const FORMAT_VERSION: u16 = 0x01FF;

/// Deepest nesting accepted on write and on read.
///
/// Decoding recurses once per level, so the limit must fit a default 2 MiB
/// thread stack in unoptimized builds. A tree snapshot spends four levels
/// per control, which still leaves room for about thirty nested controls.
pub const MAX_DEPTH: usize = 128;

/// Top-level entry point: encodes and decodes whole value graphs.
///
/// The formatter holds only immutable configuration, so a single instance
/// can serve any number of concurrent requests. Caches are created per call.
#[derive(Debug, Clone, Default)]
pub struct StateFormatter {
    adapters: AdapterRegistry,
}

impl StateFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_adapters(adapters: AdapterRegistry) -> Self {
        Self { adapters }
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    pub fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        let mut writer = GraphWriter::new(&self.adapters);
        writer.write_u16_le(FORMAT_VERSION);
        writer.write_value(value)?;
        tracing::trace!(
            kind = value.kind(),
            cached = writer.cached_entries(),
            "Serialized state graph"
        );
        Ok(writer.into_bytes())
    }

    pub fn deserialize(&self, bytes: &[u8]) -> Result<Value> {
        let mut reader = GraphReader::new(bytes, &self.adapters);
        let version = reader.read_u16_le()?;
        if version != FORMAT_VERSION {
            return Err(CorruptionKind::VersionMismatch {
                expected: FORMAT_VERSION,
                found: version,
            }
            .into());
        }
        let value = reader.read_value()?;
        match reader.remaining() {
            0 => Ok(value),
            extra => Err(CorruptionKind::TrailingBytes(extra).into()),
        }
    }
}
