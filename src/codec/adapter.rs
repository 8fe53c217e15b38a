//! Value <-> string adapters for small value-object types.
//!
//! An opaque value whose type has a registered adapter is written as its
//! type name plus a (cached) string instead of its serializer bytes, which
//! keeps things like units and colours as compact as plain strings.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::value::TypeName;

/// Converts the serializer bytes of one type to and from text.
pub trait TextAdapter: Send + Sync {
    /// Render the payload as text. `None` falls back to the opaque strategy.
    fn to_text(&self, bytes: &[u8]) -> Option<String>;

    /// Parse text back into serializer bytes.
    fn from_text(&self, text: &str) -> Option<Vec<u8>>;
}

/// Adapter for any type that both serializes with serde and round-trips
/// through `Display` / `FromStr`.
pub struct SerdeTextAdapter<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeTextAdapter<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SerdeTextAdapter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TextAdapter for SerdeTextAdapter<T>
where
    T: Serialize + DeserializeOwned + fmt::Display + FromStr,
{
    fn to_text(&self, bytes: &[u8]) -> Option<String> {
        let value: T = serde_json::from_slice(bytes).ok()?;
        Some(value.to_string())
    }

    fn from_text(&self, text: &str) -> Option<Vec<u8>> {
        let value = T::from_str(text).ok()?;
        serde_json::to_vec(&value).ok()
    }
}

/// Adapters keyed by type name. Built once and shared read-only.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<TypeName, Arc<dyn TextAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, type_name: impl Into<TypeName>, adapter: Arc<dyn TextAdapter>) {
        self.adapters.insert(type_name.into(), adapter);
    }

    /// Builder-style [`register`](Self::register) for a serde-backed type.
    pub fn with_serde<T>(mut self, type_name: impl Into<TypeName>) -> Self
    where
        T: Serialize + DeserializeOwned + fmt::Display + FromStr + 'static,
    {
        self.register(type_name, Arc::new(SerdeTextAdapter::<T>::new()));
        self
    }

    pub fn get(&self, type_name: &TypeName) -> Option<&dyn TextAdapter> {
        self.adapters.get(type_name).map(|a| a.as_ref())
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.adapters.keys()).finish()
    }
}
