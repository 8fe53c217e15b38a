//! Sparse persisted shape of a control tree's dirty state.
//!
//! On the wire a snapshot is `Pair(own, children)` where `own` is a map of
//! dirty entries (or null) and `children` is `Pair(ids, snapshots)` of two
//! parallel lists (or null).

use crate::codec::Value;
use crate::error::CorruptionKind;

/// Dirty entries collected from one container, in container order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StateDelta(Vec<(String, Value)>);

impl StateDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: Value) {
        self.0.push((key.into(), value));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_value(&self) -> Value {
        Value::Map(
            self.0
                .iter()
                .map(|(k, v)| (Value::Str(k.clone()), v.clone()))
                .collect(),
        )
    }

    pub fn from_value(value: Value) -> Result<Self, CorruptionKind> {
        let Value::Map(map) = value else {
            return Err(CorruptionKind::UnexpectedShape("state entries must be a map"));
        };
        map.into_entries()
            .into_iter()
            .map(|(k, v)| match k {
                Value::Str(key) => Ok((key, v)),
                _ => Err(CorruptionKind::UnexpectedShape("state keys must be strings")),
            })
            .collect()
    }
}

impl FromIterator<(String, Value)> for StateDelta {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for StateDelta {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Child identifiers and their snapshots, kept as parallel arrays. Children
/// without a snapshot are absent from both.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChildSnapshots {
    ids: Vec<String>,
    snapshots: Vec<Snapshot>,
}

impl ChildSnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: impl Into<String>, snapshot: Snapshot) {
        self.ids.push(id.into());
        self.snapshots.push(snapshot);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn get(&self, id: &str) -> Option<&Snapshot> {
        self.ids
            .iter()
            .position(|i| i == id)
            .map(|pos| &self.snapshots[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Snapshot)> {
        self.ids
            .iter()
            .map(String::as_str)
            .zip(self.snapshots.iter())
    }

    fn to_value(&self) -> Value {
        Value::pair(
            Value::List(self.ids.iter().cloned().map(Value::Str).collect()),
            Value::List(self.snapshots.iter().map(Snapshot::to_value).collect()),
        )
    }

    fn from_value(value: Value) -> Result<Self, CorruptionKind> {
        let Value::Pair(ids, snapshots) = value else {
            return Err(CorruptionKind::UnexpectedShape("child state must be a pair"));
        };
        let (Value::List(ids), Value::List(snapshots)) = (*ids, *snapshots) else {
            return Err(CorruptionKind::UnexpectedShape("child state must hold two lists"));
        };
        if ids.len() != snapshots.len() {
            return Err(CorruptionKind::UnexpectedShape(
                "child ids and snapshots differ in length",
            ));
        }
        let mut children = ChildSnapshots::new();
        for (id, snapshot) in ids.into_iter().zip(snapshots) {
            let Value::Str(id) = id else {
                return Err(CorruptionKind::UnexpectedShape("child ids must be strings"));
            };
            children.push(id, Snapshot::from_value(snapshot)?);
        }
        Ok(children)
    }
}

impl IntoIterator for ChildSnapshots {
    type Item = (String, Snapshot);
    type IntoIter = std::iter::Zip<std::vec::IntoIter<String>, std::vec::IntoIter<Snapshot>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter().zip(self.snapshots)
    }
}

/// The recursive, sparse state of one node and its descendants.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub own: Option<StateDelta>,
    pub children: Option<ChildSnapshots>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.own.is_none() && self.children.is_none()
    }

    pub fn to_value(&self) -> Value {
        Value::pair(
            self.own.as_ref().map(StateDelta::to_value),
            self.children.as_ref().map(ChildSnapshots::to_value),
        )
    }

    pub fn from_value(value: Value) -> Result<Self, CorruptionKind> {
        let Value::Pair(own, children) = value else {
            return Err(CorruptionKind::UnexpectedShape("snapshot must be a pair"));
        };
        let own = match *own {
            Value::Null => None,
            other => Some(StateDelta::from_value(other)?),
        };
        let children = match *children {
            Value::Null => None,
            other => Some(ChildSnapshots::from_value(other)?),
        };
        Ok(Snapshot { own, children })
    }
}
