//! Back-reference caches shared by one encode or one decode pass.
//!
//! Writer and reader assign indices in lockstep: the writer registers a
//! value the first time it emits its literal form, the reader appends when
//! it decodes that same literal. Both stop growing at [`MAX_ENTRIES`].

use std::collections::HashMap;

use crate::codec::value::TypeName;
use crate::error::CorruptionKind;

/// Indices stay within the positive range of a 16-bit signed integer.
pub const MAX_ENTRIES: usize = i16::MAX as usize;

/// Write side: value -> index, for strings and type names.
#[derive(Debug, Default)]
pub struct WriteCache {
    strings: HashMap<String, u16>,
    types: HashMap<String, u16>,
    next: u16,
}

impl WriteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string_index(&self, value: &str) -> Option<u16> {
        self.strings.get(value).copied()
    }

    pub fn type_index(&self, value: &TypeName) -> Option<u16> {
        self.types.get(value.as_str()).copied()
    }

    /// Register a string that was just written literally.
    pub fn add_string(&mut self, value: &str) {
        if let Some(index) = self.claim() {
            self.strings.insert(value.to_string(), index);
        }
    }

    pub fn add_type(&mut self, value: &TypeName) {
        if let Some(index) = self.claim() {
            self.types.insert(value.as_str().to_string(), index);
        }
    }

    pub fn len(&self) -> usize {
        usize::from(self.next)
    }

    pub fn is_empty(&self) -> bool {
        self.next == 0
    }

    fn claim(&mut self) -> Option<u16> {
        if self.len() >= MAX_ENTRIES {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(index)
    }
}

#[derive(Debug, Clone)]
enum Cached {
    Str(String),
    Type(TypeName),
}

/// Read side: an append-only list indexed by the writer's keys.
#[derive(Debug, Default)]
pub struct ReadCache {
    entries: Vec<Cached>,
}

impl ReadCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_string(&mut self, value: &str) {
        if self.entries.len() < MAX_ENTRIES {
            self.entries.push(Cached::Str(value.to_string()));
        }
    }

    pub fn push_type(&mut self, value: &TypeName) {
        if self.entries.len() < MAX_ENTRIES {
            self.entries.push(Cached::Type(value.clone()));
        }
    }

    pub fn string(&self, index: u16) -> Result<String, CorruptionKind> {
        match self.entry(index)? {
            Cached::Str(s) => Ok(s.clone()),
            Cached::Type(_) => Err(CorruptionKind::CacheKindMismatch(index)),
        }
    }

    pub fn type_name(&self, index: u16) -> Result<TypeName, CorruptionKind> {
        match self.entry(index)? {
            Cached::Type(t) => Ok(t.clone()),
            Cached::Str(_) => Err(CorruptionKind::CacheKindMismatch(index)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, index: u16) -> Result<&Cached, CorruptionKind> {
        self.entries
            .get(usize::from(index))
            .ok_or(CorruptionKind::CacheIndexOutOfRange {
                index,
                len: self.entries.len(),
            })
    }
}
