//! One request's pass over a page: load posted state, handle interactions,
//! save state for the response.
//!
//! The state field carries `Pair(control, Pair(layout_key, snapshot))`.
//! `control` maps unique ids of controls registered for control state to
//! their values (or is null); `snapshot` is the tree's sparse dirty state
//! (or null).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::codec::{Value, ValueMap};
use crate::error::{CorruptionKind, Result};
use crate::page::persister::StatePersister;
use crate::state::Snapshot;
use crate::tree::{ControlTree, NodeId, RedistributeReport};
use crate::validation::ReplayRegistry;

/// Hidden field carrying the page state, or its first chunk.
pub const STATE_FIELD: &str = "__STATE";

/// Number of chunks the state was split into. Absent when it was not split.
pub const STATE_FIELD_COUNT: &str = "__STATEFIELDCOUNT";

/// Hidden field carrying the replay registry.
pub const VALIDATION_FIELD: &str = "__VALIDATION";

/// `__STATE`, `__STATE1`, `__STATE2`, ...
fn state_chunk_name(index: usize) -> String {
    if index == 0 {
        STATE_FIELD.to_string()
    } else {
        format!("{STATE_FIELD}{index}")
    }
}

/// Hidden-field values received with a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostedFields {
    pub state: Option<String>,
    pub validation: Option<String>,
}

impl PostedFields {
    /// Pick the hidden fields out of decoded form pairs, joining a state
    /// that was split across several fields. Empty values count as absent.
    pub fn from_form<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let fields: HashMap<&str, &str> =
            pairs.into_iter().filter(|(_, value)| !value.is_empty()).collect();

        let state = match fields.get(STATE_FIELD_COUNT) {
            None => fields.get(STATE_FIELD).map(|state| state.to_string()),
            Some(raw) => {
                let count: usize = raw
                    .trim()
                    .parse()
                    .map_err(|_| CorruptionKind::InvalidFieldCount(raw.to_string()))?;
                let mut state = String::new();
                for index in 0..count {
                    let name = state_chunk_name(index);
                    match fields.get(name.as_str()) {
                        Some(chunk) => state.push_str(chunk),
                        None => return Err(CorruptionKind::MissingStateChunk(name).into()),
                    }
                }
                (!state.is_empty()).then_some(state)
            }
        };

        Ok(Self {
            state,
            validation: fields.get(VALIDATION_FIELD).map(|v| v.to_string()),
        })
    }
}

/// Hidden-field values to embed in the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFields {
    /// The whole encoded state.
    pub state: String,
    pub validation: Option<String>,
    state_chunks: Vec<String>,
}

impl PageFields {
    /// The state as rendered, split per the persister's field length.
    pub fn state_chunks(&self) -> &[String] {
        &self.state_chunks
    }

    /// Name/value pairs of every hidden input to render, in order.
    pub fn hidden_fields(&self) -> Vec<(String, String)> {
        let mut fields: Vec<(String, String)> = self
            .state_chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| (state_chunk_name(index), chunk.clone()))
            .collect();
        if self.state_chunks.len() > 1 {
            fields.push((
                STATE_FIELD_COUNT.to_string(),
                self.state_chunks.len().to_string(),
            ));
        }
        if let Some(validation) = &self.validation {
            fields.push((VALIDATION_FIELD.to_string(), validation.clone()));
        }
        fields
    }
}

/// What [`Page::load`] did with the posted state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub postback: bool,
    pub layout_mismatch: bool,
    /// Registered controls that received posted control state.
    pub control_restored: usize,
    pub redistributed: RedistributeReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    /// Persist the tree snapshot. Control state is persisted either way.
    pub state_enabled: bool,
    pub event_validation: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            state_enabled: true,
            event_validation: true,
        }
    }
}

/// Decoded state field.
struct PageBlob {
    control: HashMap<String, Value>,
    layout: String,
    snapshot: Value,
}

impl PageBlob {
    fn from_value(value: Value) -> std::result::Result<Self, CorruptionKind> {
        let Value::Pair(control, view) = value else {
            return Err(CorruptionKind::UnexpectedShape("page state must be a pair"));
        };
        let control = match *control {
            Value::Null => HashMap::new(),
            Value::Map(map) => map
                .into_entries()
                .into_iter()
                .map(|(key, value)| match key {
                    Value::Str(unique_id) => Ok((unique_id, value)),
                    _ => Err(CorruptionKind::UnexpectedShape(
                        "control state keys must be strings",
                    )),
                })
                .collect::<std::result::Result<_, _>>()?,
            _ => return Err(CorruptionKind::UnexpectedShape("control state must be a map")),
        };
        let Value::Pair(layout, snapshot) = *view else {
            return Err(CorruptionKind::UnexpectedShape("view state must be a pair"));
        };
        let Value::Str(layout) = *layout else {
            return Err(CorruptionKind::UnexpectedShape("layout key must be a string"));
        };
        Ok(Self {
            control,
            layout,
            snapshot: *snapshot,
        })
    }
}

/// A rebuilt control tree plus the request-scoped registries around it.
///
/// The layout key names the template that built the tree; a snapshot saved
/// under another key is not applied.
#[derive(Debug)]
pub struct Page {
    tree: ControlTree,
    layout_key: String,
    persister: Arc<StatePersister>,
    options: PageOptions,
    user_key: Option<String>,
    accepted: ReplayRegistry,
    offered: ReplayRegistry,
    control_registry: Vec<NodeId>,
    posted_control_state: HashMap<String, Value>,
    control_state_loaded: HashSet<String>,
}

impl Page {
    pub fn new(tree: ControlTree, layout_key: impl Into<String>, persister: Arc<StatePersister>) -> Self {
        Self {
            tree,
            layout_key: layout_key.into(),
            persister,
            options: PageOptions::default(),
            user_key: None,
            accepted: ReplayRegistry::new(),
            offered: ReplayRegistry::new(),
            control_registry: Vec::new(),
            posted_control_state: HashMap::new(),
            control_state_loaded: HashSet::new(),
        }
    }

    pub fn with_options(mut self, options: PageOptions) -> Self {
        self.options = options;
        self
    }

    /// Bind both hidden fields to one visitor, e.g. by session id. Only
    /// takes effect with an authenticating protector. Empty keys are ignored.
    pub fn with_user_key(mut self, user_key: impl Into<String>) -> Self {
        let user_key = user_key.into();
        self.user_key = (!user_key.is_empty()).then_some(user_key);
        self
    }

    pub fn user_key(&self) -> Option<&str> {
        self.user_key.as_deref()
    }

    pub fn tree(&self) -> &ControlTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ControlTree {
        &mut self.tree
    }

    pub fn layout_key(&self) -> &str {
        &self.layout_key
    }

    /// Start tracking the whole tree, then apply the posted state.
    ///
    /// Tracking first keeps restored values dirty so they are carried into
    /// the next response. Control state is applied to registered controls
    /// even when the snapshot is skipped, whether for a different layout key
    /// or because state persistence is off. Corrupted fields fail the request.
    pub fn load(&mut self, posted: &PostedFields) -> Result<LoadReport> {
        let root = self.tree.root();
        self.tree.track_subtree(root);

        let mut report = LoadReport {
            postback: posted.state.is_some(),
            ..LoadReport::default()
        };

        if self.options.event_validation {
            self.accepted = match posted.validation.as_deref() {
                Some(field) => {
                    ReplayRegistry::from_value(self.persister.decode_for(field, self.user_key())?)?
                }
                None => ReplayRegistry::new(),
            };
        }

        let Some(field) = posted.state.as_deref() else {
            return Ok(report);
        };
        let blob = PageBlob::from_value(self.persister.decode_for(field, self.user_key())?)?;

        self.posted_control_state = blob.control;
        self.control_state_loaded.clear();
        let registered = self.control_registry.clone();
        report.control_restored = registered
            .into_iter()
            .filter(|&node| self.restore_control_state(node))
            .count();

        if !self.options.state_enabled {
            tracing::debug!("State persistence disabled; ignoring posted snapshot");
            return Ok(report);
        }
        if blob.layout != self.layout_key {
            tracing::warn!(
                posted = %blob.layout,
                current = %self.layout_key,
                "Layout key changed; discarding posted state"
            );
            report.layout_mismatch = true;
            return Ok(report);
        }

        let snapshot = match blob.snapshot {
            Value::Null => None,
            other => Some(Snapshot::from_value(other)?),
        };
        report.redistributed = self.tree.redistribute(root, snapshot);
        tracing::debug!(
            restored = report.redistributed.restored,
            parked = report.redistributed.parked,
            ambiguous = report.redistributed.ambiguous,
            control = report.control_restored,
            "Loaded page state"
        );
        Ok(report)
    }

    /// Persist `node`'s control state with every response, independent of
    /// state modes. Registering after [`load`](Self::load) applies the
    /// posted value at once; each posted value is applied at most once.
    pub fn require_control_state(&mut self, node: NodeId) {
        if self.control_registry.contains(&node) {
            return;
        }
        self.control_registry.push(node);
        self.restore_control_state(node);
    }

    pub fn requires_control_state(&self, node: NodeId) -> bool {
        self.control_registry.contains(&node)
    }

    pub fn unregister_control_state(&mut self, node: NodeId) {
        self.control_registry.retain(|&n| n != node);
    }

    fn restore_control_state(&mut self, node: NodeId) -> bool {
        let unique_id = self.tree.unique_id(node);
        if self.control_state_loaded.contains(&unique_id) {
            return false;
        }
        let Some(value) = self.posted_control_state.get(&unique_id) else {
            return false;
        };
        self.tree.set_control_state(node, value.clone());
        self.control_state_loaded.insert(unique_id);
        true
    }

    /// Record an interaction the outgoing response offers.
    pub fn register_interaction(&mut self, target: &str, argument: Option<&str>) {
        if self.options.event_validation {
            self.offered.register(target, argument);
        }
    }

    /// Check a posted interaction against the registry of the previous
    /// response. Always succeeds when validation is off.
    pub fn validate_interaction(&self, target: &str, argument: Option<&str>) -> Result<()> {
        if !self.options.event_validation {
            return Ok(());
        }
        self.accepted.validate(target, argument)
    }

    pub fn offered(&self) -> &ReplayRegistry {
        &self.offered
    }

    fn collect_control_state(&self) -> Value {
        let mut map = ValueMap::new();
        for &node in &self.control_registry {
            let Some(value) = self.tree.control_state(node) else {
                continue;
            };
            let key = Value::Str(self.tree.unique_id(node));
            if map.get(&key).is_none() {
                map.insert(key, value.clone());
            }
        }
        if map.is_empty() {
            Value::Null
        } else {
            Value::Map(map)
        }
    }

    /// Collect the tree's dirty state and encode the response fields.
    pub fn save(&self) -> Result<PageFields> {
        let snapshot = if self.options.state_enabled {
            self.tree.collect(self.tree.root())
        } else {
            None
        };
        let blob = Value::pair(
            self.collect_control_state(),
            Value::pair(
                self.layout_key.as_str(),
                snapshot.as_ref().map(Snapshot::to_value),
            ),
        );
        let state = self.persister.encode_for(&blob, self.user_key())?;
        let state_chunks = self.persister.split(&state);

        let validation = if self.options.event_validation {
            Some(
                self.persister
                    .encode_for(&self.offered.to_value(), self.user_key())?,
            )
        } else {
            None
        };

        tracing::debug!(
            state_len = state.len(),
            chunks = state_chunks.len(),
            offered = self.offered.len(),
            "Saved page state"
        );
        Ok(PageFields {
            state,
            validation,
            state_chunks,
        })
    }
}
