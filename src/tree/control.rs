//! Arena-backed control tree.
//!
//! Nodes are addressed by [`NodeId`]; parent and naming-container links are
//! plain indices, so the tree has no ownership cycles. A `NodeId` is only
//! meaningful for the tree that issued it.

use std::collections::HashMap;

use crate::codec::Value;
use crate::state::{SetOutcome, Snapshot, StateContainer};
use crate::tree::propagate::{self, RedistributeReport};

/// Prefix of identifiers assigned to nodes created without one.
pub const GENERATED_ID_PREFIX: &str = "ctl";

/// Default separator between naming-container segments of a unique id.
pub const DEFAULT_ID_SEPARATOR: char = '$';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Whether a node saves its own state. `Inherit` defers to the nearest
/// ancestor with an explicit mode; the root inherits `Enabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateMode {
    #[default]
    Inherit,
    Enabled,
    Disabled,
}

/// Construction options for a node.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    kind: String,
    id: Option<String>,
    naming_container: bool,
    enable_state: bool,
    state_mode: StateMode,
}

impl NodeSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            naming_container: false,
            enable_state: true,
            state_mode: StateMode::Inherit,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn naming_container(mut self) -> Self {
        self.naming_container = true;
        self
    }

    /// Exclude this node and its whole subtree from persistence.
    pub fn without_state(mut self) -> Self {
        self.enable_state = false;
        self
    }

    pub fn state_mode(mut self, mode: StateMode) -> Self {
        self.state_mode = mode;
        self
    }
}

/// Result of looking up a child by identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildMatch {
    Missing,
    Unique(NodeId),
    Ambiguous(usize),
}

#[derive(Debug)]
struct Node {
    kind: String,
    id: String,
    generated_id: bool,
    parent: Option<NodeId>,
    naming_container: Option<NodeId>,
    children: Vec<NodeId>,
    is_naming_container: bool,
    next_generated: u32,
    enable_state: bool,
    state_mode: StateMode,
    tracking: bool,
    state: Option<StateContainer>,
    control_state: Option<Value>,
    parked: HashMap<String, Snapshot>,
}

#[derive(Debug)]
pub struct ControlTree {
    nodes: Vec<Node>,
    separator: char,
}

impl ControlTree {
    /// A tree holding only a root naming container.
    pub fn new(root_kind: impl Into<String>) -> Self {
        Self::with_separator(root_kind, DEFAULT_ID_SEPARATOR)
    }

    pub fn with_separator(root_kind: impl Into<String>, separator: char) -> Self {
        let root = Node {
            kind: root_kind.into(),
            id: String::new(),
            generated_id: false,
            parent: None,
            naming_container: None,
            children: Vec::new(),
            is_naming_container: true,
            next_generated: 0,
            enable_state: true,
            state_mode: StateMode::Inherit,
            tracking: false,
            state: None,
            control_state: None,
            parked: HashMap::new(),
        };
        Self {
            nodes: vec![root],
            separator,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Append a child to `parent`.
    ///
    /// A node without an identifier gets `ctl<N>` from its naming
    /// container's counter. A child added under a tracking parent starts
    /// tracking, and any state parked on the parent under the child's
    /// identifier is applied at once.
    pub fn add_child(&mut self, parent: NodeId, node_spec: NodeSpec) -> NodeId {
        let naming_container = if self.node(parent).is_naming_container {
            parent
        } else {
            self.node(parent).naming_container.unwrap_or(parent)
        };

        let (id, generated_id) = match node_spec.id.filter(|id| !id.is_empty()) {
            Some(id) => (id, false),
            None => {
                let scope = self.node_mut(naming_container);
                let n = scope.next_generated;
                scope.next_generated += 1;
                (format!("{GENERATED_ID_PREFIX}{n}"), true)
            }
        };

        let node = NodeId(self.nodes.len());
        let tracking = self.node(parent).tracking;
        self.nodes.push(Node {
            kind: node_spec.kind,
            id,
            generated_id,
            parent: Some(parent),
            naming_container: Some(naming_container),
            children: Vec::new(),
            is_naming_container: node_spec.naming_container,
            next_generated: 0,
            enable_state: node_spec.enable_state,
            state_mode: node_spec.state_mode,
            tracking,
            state: None,
            control_state: None,
            parked: HashMap::new(),
        });
        self.node_mut(parent).children.push(node);

        let id = self.node(node).id.clone();
        if let Some(snapshot) = self.node_mut(parent).parked.remove(&id) {
            tracing::trace!(node = %id, "Applying parked state to late child");
            let mut report = RedistributeReport::default();
            propagate::redistribute_into(self, node, snapshot, &mut report);
        }

        node
    }

    pub fn id(&self, node: NodeId) -> &str {
        &self.node(node).id
    }

    pub fn kind(&self, node: NodeId) -> &str {
        &self.node(node).kind
    }

    pub fn has_generated_id(&self, node: NodeId) -> bool {
        self.node(node).generated_id
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.node(node).children
    }

    pub fn naming_container(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).naming_container
    }

    pub fn is_naming_container(&self, node: NodeId) -> bool {
        self.node(node).is_naming_container
    }

    /// Identifiers of the enclosing naming containers and the node itself,
    /// joined by the separator. The root contributes no segment.
    pub fn unique_id(&self, node: NodeId) -> String {
        if node == self.root() {
            return String::new();
        }
        let mut segments = vec![self.id(node)];
        let mut scope = self.naming_container(node);
        while let Some(container) = scope {
            if container == self.root() {
                break;
            }
            segments.push(self.id(container));
            scope = self.naming_container(container);
        }
        segments.reverse();
        segments.join(&self.separator.to_string())
    }

    /// Resolve a path produced by [`unique_id`](Self::unique_id).
    pub fn find_by_unique_id(&self, unique_id: &str) -> Option<NodeId> {
        if unique_id.is_empty() {
            return Some(self.root());
        }
        let mut scope = self.root();
        let mut found = None;
        for segment in unique_id.split(self.separator) {
            if found.is_some() && !self.is_naming_container(scope) {
                return None;
            }
            let next = self
                .nodes
                .iter()
                .position(|n| n.naming_container == Some(scope) && n.id == segment)
                .map(NodeId)?;
            found = Some(next);
            scope = next;
        }
        found
    }

    pub fn find_child(&self, parent: NodeId, id: &str) -> ChildMatch {
        let mut matches = self
            .children(parent)
            .iter()
            .copied()
            .filter(|&c| self.id(c) == id);
        match (matches.next(), matches.count()) {
            (None, _) => ChildMatch::Missing,
            (Some(child), 0) => ChildMatch::Unique(child),
            (Some(_), rest) => ChildMatch::Ambiguous(rest + 1),
        }
    }

    pub fn enable_state(&self, node: NodeId) -> bool {
        self.node(node).enable_state
    }

    pub fn set_enable_state(&mut self, node: NodeId, enabled: bool) {
        self.node_mut(node).enable_state = enabled;
    }

    pub fn state_mode(&self, node: NodeId) -> StateMode {
        self.node(node).state_mode
    }

    pub fn set_state_mode(&mut self, node: NodeId, mode: StateMode) {
        self.node_mut(node).state_mode = mode;
    }

    /// Whether `node` will save its own state, judged from its ancestors.
    pub fn is_state_enabled(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            let data = self.node(n);
            if !data.enable_state {
                return false;
            }
            match data.state_mode {
                StateMode::Enabled => return true,
                StateMode::Disabled => return false,
                StateMode::Inherit => current = data.parent,
            }
        }
        true
    }

    pub fn state(&self, node: NodeId) -> Option<&StateContainer> {
        self.node(node).state.as_ref()
    }

    /// The node's container, created on first use. A container created on
    /// a tracking node starts out tracking.
    pub fn state_mut(&mut self, node: NodeId) -> &mut StateContainer {
        let data = self.node_mut(node);
        let tracking = data.tracking;
        data.state.get_or_insert_with(|| {
            let mut container = StateContainer::new();
            if tracking {
                container.begin_tracking();
            }
            container
        })
    }

    pub fn get(&self, node: NodeId, key: &str) -> Option<&Value> {
        self.state(node).and_then(|s| s.get(key))
    }

    pub fn set(&mut self, node: NodeId, key: impl Into<String>, value: impl Into<Value>) -> SetOutcome {
        self.state_mut(node).set(key, value.into())
    }

    /// State the node keeps regardless of its state mode. Persisted only
    /// while the page has the node registered for control state.
    pub fn control_state(&self, node: NodeId) -> Option<&Value> {
        self.node(node).control_state.as_ref()
    }

    /// Replace the node's control state. Null clears it.
    pub fn set_control_state(&mut self, node: NodeId, value: impl Into<Value>) {
        let value = value.into();
        self.node_mut(node).control_state = (!value.is_null()).then_some(value);
    }

    /// Switch one node to tracking. Called once its initialization is done.
    pub fn begin_tracking(&mut self, node: NodeId) {
        let data = self.node_mut(node);
        data.tracking = true;
        if let Some(state) = data.state.as_mut() {
            state.begin_tracking();
        }
    }

    pub fn is_tracking(&self, node: NodeId) -> bool {
        self.node(node).tracking
    }

    /// [`begin_tracking`](Self::begin_tracking) for `node` and every descendant.
    pub fn track_subtree(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            self.begin_tracking(next);
            stack.extend(self.children(next).iter().copied());
        }
    }

    pub(crate) fn park(&mut self, parent: NodeId, id: String, snapshot: Snapshot) {
        self.node_mut(parent).parked.insert(id, snapshot);
    }

    /// Identifiers of state waiting on `node` for children not yet added.
    pub fn parked_ids(&self, node: NodeId) -> Vec<&str> {
        let mut ids: Vec<&str> = self.node(node).parked.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Apply a snapshot to `node` and its subtree. See [`propagate::redistribute`].
    pub fn redistribute(&mut self, node: NodeId, snapshot: Option<Snapshot>) -> RedistributeReport {
        propagate::redistribute(self, node, snapshot)
    }

    /// Collect the dirty state of `node` and its subtree. See [`propagate::collect`].
    pub fn collect(&self, node: NodeId) -> Option<Snapshot> {
        propagate::collect(self, node)
    }

    fn node(&self, node: NodeId) -> &Node {
        &self.nodes[node.0]
    }

    fn node_mut(&mut self, node: NodeId) -> &mut Node {
        &mut self.nodes[node.0]
    }
}
