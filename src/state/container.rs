//! Dirty-tracking key/value store owned by one control.

use crate::codec::Value;
use crate::state::StateDelta;

/// One stored entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StateEntry {
    pub key: String,
    pub value: Value,
    pub dirty: bool,
}

/// What a [`StateContainer::set`] call did to the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// Stored without marking dirty (tracking is off).
    Stored,
    /// Stored and marked dirty; it will be persisted.
    MarkedDirty,
    /// A null written while not tracking removed the entry.
    Removed,
}

/// Ordered key/value store with per-entry dirty flags.
///
/// Writes made before [`begin_tracking`](Self::begin_tracking) are never
/// dirty, so initialization defaults are not persisted. After it, every
/// write marks its entry dirty whether or not the value changed.
#[derive(Debug, Clone, Default)]
pub struct StateContainer {
    entries: Vec<StateEntry>,
    tracking: bool,
}

impl StateContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.position(key).map(|i| &self.entries[i].value)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) -> SetOutcome {
        let key = key.into();
        let existing = self.position(&key);

        if value.is_null() && !self.tracking {
            if let Some(i) = existing {
                self.entries.remove(i);
            }
            return SetOutcome::Removed;
        }

        let dirty = self.tracking;
        match existing {
            Some(i) => {
                let entry = &mut self.entries[i];
                entry.value = value;
                entry.dirty |= dirty;
            }
            None => self.entries.push(StateEntry { key, value, dirty }),
        }

        if dirty {
            SetOutcome::MarkedDirty
        } else {
            SetOutcome::Stored
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.position(key).map(|i| self.entries.remove(i).value)
    }

    pub fn begin_tracking(&mut self) {
        self.tracking = true;
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn is_dirty(&self, key: &str) -> bool {
        self.position(key).is_some_and(|i| self.entries[i].dirty)
    }

    /// Override the dirty flag of one entry. Returns `false` if absent.
    pub fn set_dirty(&mut self, key: &str, dirty: bool) -> bool {
        match self.position(key) {
            Some(i) => {
                self.entries[i].dirty = dirty;
                true
            }
            None => false,
        }
    }

    /// Mark every entry dirty so the whole container is resent.
    pub fn force_all_dirty(&mut self) {
        for entry in &mut self.entries {
            entry.dirty = true;
        }
    }

    /// Only the dirty entries, or `None` when nothing is dirty.
    pub fn collect_dirty(&self) -> Option<StateDelta> {
        let delta: StateDelta = self
            .entries
            .iter()
            .filter(|e| e.dirty)
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect();
        if delta.is_empty() {
            None
        } else {
            Some(delta)
        }
    }

    /// Re-apply a previously collected delta through [`set`](Self::set).
    /// Entries only become dirty if tracking is already on.
    pub fn restore(&mut self, delta: StateDelta) {
        for (key, value) in delta {
            self.set(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateEntry> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }
}
