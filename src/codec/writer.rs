//! Graph writer: recursive tag-prefixed encoding of a [`Value`].

use crate::codec::adapter::AdapterRegistry;
use crate::codec::cache::WriteCache;
use crate::codec::tag::{self, element};
use crate::codec::value::{ObjectArray, OpaqueValue, PrimitiveArray, TypeName, Value, ValueMap};
use crate::codec::MAX_DEPTH;
use crate::error::{Result, StateError};

/// Writes one value graph. The cache lives exactly as long as the writer.
pub(crate) struct GraphWriter<'a> {
    buf: Vec<u8>,
    cache: WriteCache,
    adapters: &'a AdapterRegistry,
    depth: usize,
}

impl<'a> GraphWriter<'a> {
    pub fn new(adapters: &'a AdapterRegistry) -> Self {
        Self {
            buf: Vec::with_capacity(256),
            cache: WriteCache::new(),
            adapters,
            depth: 0,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub fn write_u16_le(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(StateError::Unencodable(format!(
                "nesting exceeds {MAX_DEPTH} levels"
            )));
        }
        let result = self.dispatch(value);
        self.depth -= 1;
        result
    }

    fn dispatch(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.put(tag::NULL),
            Value::Str(s) => self.write_string(s)?,
            Value::Type(t) => self.write_type(t)?,
            Value::Int16(v) => {
                self.put(tag::INT16);
                self.buf.extend_from_slice(&v.to_le_bytes());
            }
            Value::Int32(v) => self.write_int32(*v),
            Value::Int64(v) => {
                self.put(tag::INT64);
                self.buf.extend_from_slice(&v.to_le_bytes());
            }
            Value::Bool(b) => self.put(if *b { tag::TRUE } else { tag::FALSE }),
            Value::Char(c) => {
                self.put(tag::CHAR);
                self.buf.extend_from_slice(&u32::from(*c).to_le_bytes());
            }
            Value::Double(d) => {
                self.put(tag::DOUBLE);
                self.buf.extend_from_slice(&d.to_le_bytes());
            }
            Value::Timestamp(ts) => {
                self.put(tag::TIMESTAMP);
                self.buf.extend_from_slice(&ts.timestamp().to_le_bytes());
                self.buf
                    .extend_from_slice(&ts.timestamp_subsec_nanos().to_le_bytes());
            }
            Value::Enum(e) => {
                self.put(tag::ENUM);
                self.write_type(&e.type_name)?;
                let underlying = match i32::try_from(e.value) {
                    Ok(small) => Value::Int32(small),
                    Err(_) => Value::Int64(e.value),
                };
                self.write_value(&underlying)?;
            }
            Value::PrimitiveArray(array) => self.write_primitive_array(array)?,
            Value::ObjectArray(array) => self.write_object_array(array)?,
            Value::Pair(a, b) => {
                self.put(tag::PAIR);
                self.write_value(a)?;
                self.write_value(b)?;
            }
            Value::Triplet(a, b, c) => {
                self.put(tag::TRIPLET);
                self.write_value(a)?;
                self.write_value(b)?;
                self.write_value(c)?;
            }
            Value::List(items) => {
                self.put(tag::LIST);
                self.write_len(items.len())?;
                for item in items {
                    self.write_value(item)?;
                }
            }
            Value::Map(map) => self.write_map(map)?,
            Value::Opaque(opaque) => self.write_opaque(opaque)?,
        }
        Ok(())
    }

    fn put(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Seven bits per byte, low group first, high bit set on all but the last.
    fn write_len(&mut self, len: usize) -> Result<()> {
        if len > i32::MAX as usize {
            return Err(StateError::Unencodable(format!(
                "length {len} exceeds the 31-bit range"
            )));
        }
        let mut rest = len as u32;
        while rest >= 0x80 {
            self.put((rest as u8) | 0x80);
            rest >>= 7;
        }
        self.put(rest as u8);
        Ok(())
    }

    fn write_literal(&mut self, text: &str) -> Result<()> {
        self.write_len(text.len())?;
        self.buf.extend_from_slice(text.as_bytes());
        Ok(())
    }

    fn write_int32(&mut self, value: i32) {
        match u8::try_from(value) {
            Ok(byte) => {
                self.put(tag::INT32_BYTE);
                self.put(byte);
            }
            Err(_) => {
                self.put(tag::INT32);
                self.buf.extend_from_slice(&value.to_le_bytes());
            }
        }
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        if let Some(index) = self.cache.string_index(value) {
            self.put(tag::STR_REF);
            self.write_u16_le(index);
            return Ok(());
        }
        self.put(tag::STR);
        self.write_literal(value)?;
        self.cache.add_string(value);
        Ok(())
    }

    fn write_type(&mut self, value: &TypeName) -> Result<()> {
        if let Some(index) = self.cache.type_index(value) {
            self.put(tag::TYPE_REF);
            self.write_u16_le(index);
            return Ok(());
        }
        self.put(tag::TYPE);
        self.write_literal(value.as_str())?;
        self.cache.add_type(value);
        Ok(())
    }

    fn write_primitive_array(&mut self, array: &PrimitiveArray) -> Result<()> {
        self.put(tag::PRIMITIVE_ARRAY);
        match array {
            PrimitiveArray::Bytes(items) => {
                self.put(element::BYTE);
                self.write_len(items.len())?;
                self.buf.extend_from_slice(items);
            }
            PrimitiveArray::Bools(items) => {
                self.put(element::BOOL);
                self.write_len(items.len())?;
                self.buf.extend(items.iter().map(|b| u8::from(*b)));
            }
            PrimitiveArray::Int16(items) => {
                self.put(element::INT16);
                self.write_len(items.len())?;
                for v in items {
                    self.buf.extend_from_slice(&v.to_le_bytes());
                }
            }
            PrimitiveArray::Int32(items) => {
                self.put(element::INT32);
                self.write_len(items.len())?;
                for v in items {
                    self.buf.extend_from_slice(&v.to_le_bytes());
                }
            }
            PrimitiveArray::Int64(items) => {
                self.put(element::INT64);
                self.write_len(items.len())?;
                for v in items {
                    self.buf.extend_from_slice(&v.to_le_bytes());
                }
            }
            PrimitiveArray::Doubles(items) => {
                self.put(element::DOUBLE);
                self.write_len(items.len())?;
                for v in items {
                    self.buf.extend_from_slice(&v.to_le_bytes());
                }
            }
            PrimitiveArray::Chars(items) => {
                self.put(element::CHAR);
                self.write_len(items.len())?;
                for c in items {
                    self.buf.extend_from_slice(&u32::from(*c).to_le_bytes());
                }
            }
        }
        Ok(())
    }

    fn write_object_array(&mut self, array: &ObjectArray) -> Result<()> {
        self.put(tag::OBJECT_ARRAY);
        self.write_type(&array.element_type)?;
        self.write_len(array.items.len())?;
        for item in &array.items {
            self.write_value(item)?;
        }
        Ok(())
    }

    fn write_map(&mut self, map: &ValueMap) -> Result<()> {
        self.put(tag::MAP);
        self.write_len(map.len())?;
        for (key, value) in map.iter() {
            if key.is_null() {
                return Err(StateError::Unencodable("map key is null".to_string()));
            }
            self.write_value(key)?;
            self.write_value(value)?;
        }
        Ok(())
    }

    fn write_opaque(&mut self, opaque: &OpaqueValue) -> Result<()> {
        if opaque.type_name.as_str().is_empty() {
            return Err(StateError::Unencodable(
                "opaque value without a type name".to_string(),
            ));
        }
        let formatted = self
            .adapters
            .get(&opaque.type_name)
            .and_then(|adapter| adapter.to_text(&opaque.bytes));
        match formatted {
            Some(text) => {
                self.put(tag::FORMATTED);
                self.write_type(&opaque.type_name)?;
                self.write_string(&text)?;
            }
            None => {
                self.put(tag::OPAQUE);
                self.write_type(&opaque.type_name)?;
                self.write_len(opaque.bytes.len())?;
                self.buf.extend_from_slice(&opaque.bytes);
            }
        }
        Ok(())
    }
}
