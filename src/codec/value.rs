//! The closed set of shapes the state codec transports.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Name of a runtime type, carried on the wire so a reader can rebuild
/// enumeration and opaque values without schema knowledge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName(String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// An enumeration value: its type plus the underlying integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub type_name: TypeName,
    pub value: i64,
}

impl EnumValue {
    pub fn new(type_name: impl Into<TypeName>, value: i64) -> Self {
        Self {
            type_name: type_name.into(),
            value,
        }
    }
}

/// Arrays of machine primitives. These are written in bulk with a single
/// element-kind byte, never with a tag per element.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveArray {
    Bytes(Vec<u8>),
    Bools(Vec<bool>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Doubles(Vec<f64>),
    Chars(Vec<char>),
}

impl PrimitiveArray {
    pub fn len(&self) -> usize {
        match self {
            PrimitiveArray::Bytes(v) => v.len(),
            PrimitiveArray::Bools(v) => v.len(),
            PrimitiveArray::Int16(v) => v.len(),
            PrimitiveArray::Int32(v) => v.len(),
            PrimitiveArray::Int64(v) => v.len(),
            PrimitiveArray::Doubles(v) => v.len(),
            PrimitiveArray::Chars(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A homogeneous array of non-primitive elements, each written with its own tag.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectArray {
    pub element_type: TypeName,
    pub items: Vec<Value>,
}

/// Key/value pairs. Equality ignores insertion order.
#[derive(Debug, Clone, Default)]
pub struct ValueMap {
    entries: Vec<(Value, Value)>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value stored under `key`.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.entries.push((key, value));
        None
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn into_entries(self) -> Vec<(Value, Value)> {
        self.entries
    }
}

impl PartialEq for ValueMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl FromIterator<(Value, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// An object the codec does not understand: a type name plus bytes produced
/// by an injected serializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueValue {
    pub type_name: TypeName,
    pub bytes: Vec<u8>,
}

impl OpaqueValue {
    pub fn new(type_name: impl Into<TypeName>, bytes: Vec<u8>) -> Self {
        Self {
            type_name: type_name.into(),
            bytes,
        }
    }

    /// Serialize `value` with the default object serializer (JSON).
    pub fn from_serde<T: Serialize>(type_name: impl Into<TypeName>, value: &T) -> Result<Self> {
        Ok(Self::new(type_name, serde_json::to_vec(value)?))
    }

    pub fn to_serde<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.bytes)?)
    }
}

/// The unit the codec transports.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Char(char),
    Str(String),
    Timestamp(DateTime<Utc>),
    Type(TypeName),
    Enum(EnumValue),
    PrimitiveArray(PrimitiveArray),
    ObjectArray(ObjectArray),
    Pair(Box<Value>, Box<Value>),
    Triplet(Box<Value>, Box<Value>, Box<Value>),
    List(Vec<Value>),
    Map(ValueMap),
    Opaque(OpaqueValue),
}

impl Value {
    pub fn pair(first: impl Into<Value>, second: impl Into<Value>) -> Self {
        Value::Pair(Box::new(first.into()), Box::new(second.into()))
    }

    pub fn triplet(
        first: impl Into<Value>,
        second: impl Into<Value>,
        third: impl Into<Value>,
    ) -> Self {
        Value::Triplet(
            Box::new(first.into()),
            Box::new(second.into()),
            Box::new(third.into()),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Widen any integer variant to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Short shape name used in logs and the CLI dump.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Double(_) => "double",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::Type(_) => "type",
            Value::Enum(_) => "enum",
            Value::PrimitiveArray(_) => "primitive-array",
            Value::ObjectArray(_) => "object-array",
            Value::Pair(..) => "pair",
            Value::Triplet(..) => "triplet",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Opaque(_) => "opaque",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<EnumValue> for Value {
    fn from(v: EnumValue) -> Self {
        Value::Enum(v)
    }
}

impl From<PrimitiveArray> for Value {
    fn from(v: PrimitiveArray) -> Self {
        Value::PrimitiveArray(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<ValueMap> for Value {
    fn from(v: ValueMap) -> Self {
        Value::Map(v)
    }
}

impl From<OpaqueValue> for Value {
    fn from(v: OpaqueValue) -> Self {
        Value::Opaque(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
