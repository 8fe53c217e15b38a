//! Graph reader: decodes a tag-prefixed stream back into a [`Value`].
//!
//! Decoding is driven purely by the leading tag of each value. The stream
//! must be read linearly in write order; back-references only resolve
//! against literals already seen in this pass.

use chrono::{DateTime, Utc};

use crate::codec::adapter::AdapterRegistry;
use crate::codec::cache::ReadCache;
use crate::codec::tag::{self, element, Strategy};
use crate::codec::value::{
    EnumValue, ObjectArray, OpaqueValue, PrimitiveArray, TypeName, Value, ValueMap,
};
use crate::codec::MAX_DEPTH;
use crate::error::{CorruptionKind, Result};

pub(crate) struct GraphReader<'a> {
    bytes: &'a [u8],
    offset: usize,
    cache: ReadCache,
    adapters: &'a AdapterRegistry,
    depth: usize,
}

impl<'a> GraphReader<'a> {
    pub fn new(bytes: &'a [u8], adapters: &'a AdapterRegistry) -> Self {
        Self {
            bytes,
            offset: 0,
            cache: ReadCache::new(),
            adapters,
            depth: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, len: usize) -> std::result::Result<&'a [u8], CorruptionKind> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or(CorruptionKind::Truncated)?;
        if end > self.bytes.len() {
            return Err(CorruptionKind::Truncated);
        }
        let out = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(out)
    }

    fn take_array<const N: usize>(&mut self) -> std::result::Result<[u8; N], CorruptionKind> {
        let chunk = self.take(N)?;
        chunk.try_into().map_err(|_| CorruptionKind::Truncated)
    }

    pub fn read_u8(&mut self) -> std::result::Result<u8, CorruptionKind> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> std::result::Result<u16, CorruptionKind> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    fn read_i16_le(&mut self) -> std::result::Result<i16, CorruptionKind> {
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    fn read_i32_le(&mut self) -> std::result::Result<i32, CorruptionKind> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    fn read_u32_le(&mut self) -> std::result::Result<u32, CorruptionKind> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    fn read_i64_le(&mut self) -> std::result::Result<i64, CorruptionKind> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    fn read_f64_le(&mut self) -> std::result::Result<f64, CorruptionKind> {
        Ok(f64::from_le_bytes(self.take_array()?))
    }

    fn read_char(&mut self) -> std::result::Result<char, CorruptionKind> {
        let raw = self.read_u32_le()?;
        char::from_u32(raw).ok_or(CorruptionKind::InvalidChar(raw))
    }

    fn read_len(&mut self) -> std::result::Result<usize, CorruptionKind> {
        let mut value: u32 = 0;
        for group in 0..5 {
            let byte = self.read_u8()?;
            let bits = u32::from(byte & 0x7F);
            if group == 4 && bits > 0x07 {
                return Err(CorruptionKind::InvalidLength);
            }
            value |= bits << (7 * group);
            if byte & 0x80 == 0 {
                return Ok(value as usize);
            }
        }
        Err(CorruptionKind::InvalidLength)
    }

    /// Read a count of elements that each occupy at least `min_size` bytes,
    /// rejecting counts the remaining input cannot possibly hold.
    fn read_count(&mut self, min_size: usize) -> std::result::Result<usize, CorruptionKind> {
        let len = self.read_len()?;
        if len.saturating_mul(min_size) > self.remaining() {
            return Err(CorruptionKind::Truncated);
        }
        Ok(len)
    }

    fn read_literal(&mut self) -> std::result::Result<String, CorruptionKind> {
        let len = self.read_len()?;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| CorruptionKind::InvalidUtf8)
    }

    pub fn read_value(&mut self) -> Result<Value> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CorruptionKind::TooDeep(MAX_DEPTH).into());
        }
        let tag = self.read_u8()?;
        let value = self.read_tagged(tag);
        self.depth -= 1;
        value
    }

    fn read_tagged(&mut self, tag: u8) -> Result<Value> {
        if tag == tag::NULL {
            return Ok(Value::Null);
        }
        let (strategy, variant) = tag::lookup(tag).ok_or(CorruptionKind::UnknownTag(tag))?;
        let value = match strategy {
            Strategy::Str => Value::Str(self.read_string_variant(variant)?),
            Strategy::Type => Value::Type(self.read_type_variant(variant)?),
            Strategy::Int16 => Value::Int16(self.read_i16_le()?),
            Strategy::Int32 if variant == 0 => Value::Int32(self.read_i32_le()?),
            Strategy::Int32 => Value::Int32(i32::from(self.read_u8()?)),
            Strategy::Int64 => Value::Int64(self.read_i64_le()?),
            Strategy::Bool => Value::Bool(variant == 0),
            Strategy::Char => Value::Char(self.read_char()?),
            Strategy::Double => Value::Double(self.read_f64_le()?),
            Strategy::Timestamp => Value::Timestamp(self.read_timestamp()?),
            Strategy::Enum => {
                let type_name = self.read_type_value()?;
                let value = self
                    .read_value()?
                    .as_i64()
                    .ok_or(CorruptionKind::UnexpectedShape("enum underlying value"))?;
                Value::Enum(EnumValue { type_name, value })
            }
            Strategy::PrimitiveArray => Value::PrimitiveArray(self.read_primitive_array()?),
            Strategy::ObjectArray => {
                let element_type = self.read_type_value()?;
                let len = self.read_count(1)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.read_value()?);
                }
                Value::ObjectArray(ObjectArray {
                    element_type,
                    items,
                })
            }
            Strategy::Pair => {
                let first = self.read_value()?;
                let second = self.read_value()?;
                Value::pair(first, second)
            }
            Strategy::Triplet => {
                let first = self.read_value()?;
                let second = self.read_value()?;
                let third = self.read_value()?;
                Value::triplet(first, second, third)
            }
            Strategy::List => {
                let len = self.read_count(1)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.read_value()?);
                }
                Value::List(items)
            }
            Strategy::Map => {
                let len = self.read_count(2)?;
                let mut map = ValueMap::new();
                for _ in 0..len {
                    let key = self.read_value()?;
                    let value = self.read_value()?;
                    map.insert(key, value);
                }
                Value::Map(map)
            }
            Strategy::Formatted => Value::Opaque(self.read_formatted()?),
            Strategy::Opaque => {
                let type_name = self.read_type_value()?;
                let len = self.read_len()?;
                let bytes = self.take(len)?.to_vec();
                Value::Opaque(OpaqueValue { type_name, bytes })
            }
        };
        Ok(value)
    }

    fn read_string_variant(&mut self, variant: u8) -> std::result::Result<String, CorruptionKind> {
        if variant == 0 {
            let text = self.read_literal()?;
            self.cache.push_string(&text);
            Ok(text)
        } else {
            let index = self.read_u16_le()?;
            self.cache.string(index)
        }
    }

    fn read_type_variant(&mut self, variant: u8) -> std::result::Result<TypeName, CorruptionKind> {
        if variant == 0 {
            let name = TypeName::new(self.read_literal()?);
            self.cache.push_type(&name);
            Ok(name)
        } else {
            let index = self.read_u16_le()?;
            self.cache.type_name(index)
        }
    }

    /// A nested value that must be a type name.
    fn read_type_value(&mut self) -> std::result::Result<TypeName, CorruptionKind> {
        match self.read_u8()? {
            tag::TYPE => self.read_type_variant(0),
            tag::TYPE_REF => self.read_type_variant(1),
            _ => Err(CorruptionKind::UnexpectedShape("expected a type name")),
        }
    }

    /// A nested value that must be a string.
    fn read_string_value(&mut self) -> std::result::Result<String, CorruptionKind> {
        match self.read_u8()? {
            tag::STR => self.read_string_variant(0),
            tag::STR_REF => self.read_string_variant(1),
            _ => Err(CorruptionKind::UnexpectedShape("expected a string")),
        }
    }

    fn read_timestamp(&mut self) -> std::result::Result<DateTime<Utc>, CorruptionKind> {
        let secs = self.read_i64_le()?;
        let nanos = self.read_u32_le()?;
        DateTime::from_timestamp(secs, nanos).ok_or(CorruptionKind::InvalidTimestamp)
    }

    fn read_formatted(&mut self) -> std::result::Result<OpaqueValue, CorruptionKind> {
        let type_name = self.read_type_value()?;
        let text = self.read_string_value()?;
        let adapter = self
            .adapters
            .get(&type_name)
            .ok_or_else(|| CorruptionKind::MissingAdapter(type_name.to_string()))?;
        let bytes = adapter
            .from_text(&text)
            .ok_or_else(|| CorruptionKind::AdapterRejected {
                type_name: type_name.to_string(),
                text: text.clone(),
            })?;
        Ok(OpaqueValue { type_name, bytes })
    }

    fn read_primitive_array(&mut self) -> std::result::Result<PrimitiveArray, CorruptionKind> {
        let kind = self.read_u8()?;
        let array = match kind {
            element::BYTE => {
                let len = self.read_count(1)?;
                PrimitiveArray::Bytes(self.take(len)?.to_vec())
            }
            element::BOOL => {
                let len = self.read_count(1)?;
                let raw = self.take(len)?;
                let mut items = Vec::with_capacity(len);
                for byte in raw {
                    items.push(match *byte {
                        0 => false,
                        1 => true,
                        _ => return Err(CorruptionKind::UnexpectedShape("bool array element")),
                    });
                }
                PrimitiveArray::Bools(items)
            }
            element::INT16 => {
                let len = self.read_count(2)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.read_i16_le()?);
                }
                PrimitiveArray::Int16(items)
            }
            element::INT32 => {
                let len = self.read_count(4)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.read_i32_le()?);
                }
                PrimitiveArray::Int32(items)
            }
            element::INT64 => {
                let len = self.read_count(8)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.read_i64_le()?);
                }
                PrimitiveArray::Int64(items)
            }
            element::DOUBLE => {
                let len = self.read_count(8)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.read_f64_le()?);
                }
                PrimitiveArray::Doubles(items)
            }
            element::CHAR => {
                let len = self.read_count(4)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.read_char()?);
                }
                PrimitiveArray::Chars(items)
            }
            other => return Err(CorruptionKind::UnknownArrayKind(other)),
        };
        Ok(array)
    }
}
