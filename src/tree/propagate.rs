//! Gathering a tree's dirty state into a [`Snapshot`] and pushing one back.

use crate::state::{ChildSnapshots, Snapshot, StateContainer};
use crate::tree::control::{ChildMatch, ControlTree, NodeId, StateMode};

/// Counters describing what [`redistribute`] did with a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedistributeReport {
    /// Nodes whose own entries were restored.
    pub restored: usize,
    /// Child snapshots kept on the parent until a matching child is added.
    pub parked: usize,
    /// Child snapshots dropped because several children share the id.
    pub ambiguous: usize,
}

/// Collect the dirty state of `node` and its subtree.
///
/// The result is sparse: nodes with nothing dirty, and nodes excluded from
/// persistence, contribute nothing, and `None` means the whole subtree is
/// clean.
pub fn collect(tree: &ControlTree, node: NodeId) -> Option<Snapshot> {
    collect_with_mode(tree, node, StateMode::Enabled)
}

fn collect_with_mode(tree: &ControlTree, node: NodeId, inherited: StateMode) -> Option<Snapshot> {
    if !tree.enable_state(node) {
        return None;
    }
    let mode = match tree.state_mode(node) {
        StateMode::Inherit => inherited,
        explicit => explicit,
    };

    let own = if mode == StateMode::Enabled {
        tree.state(node).and_then(StateContainer::collect_dirty)
    } else {
        None
    };

    let mut children: Option<ChildSnapshots> = None;
    for &child in tree.children(node) {
        if let Some(snapshot) = collect_with_mode(tree, child, mode) {
            children
                .get_or_insert_with(ChildSnapshots::new)
                .push(tree.id(child), snapshot);
        }
    }

    if own.is_none() && children.is_none() {
        None
    } else {
        Some(Snapshot { own, children })
    }
}

/// Apply a snapshot to `node` and its subtree, matching children by id.
///
/// Entries for children that do not exist yet are parked on the parent and
/// applied when the child is added. Entries whose id matches more than one
/// child are skipped.
pub fn redistribute(
    tree: &mut ControlTree,
    node: NodeId,
    snapshot: Option<Snapshot>,
) -> RedistributeReport {
    let mut report = RedistributeReport::default();
    if let Some(snapshot) = snapshot {
        redistribute_into(tree, node, snapshot, &mut report);
    }
    report
}

pub(crate) fn redistribute_into(
    tree: &mut ControlTree,
    node: NodeId,
    snapshot: Snapshot,
    report: &mut RedistributeReport,
) {
    if !tree.enable_state(node) {
        tracing::trace!(node = %tree.unique_id(node), "Skipping state for node without persistence");
        return;
    }

    if let Some(own) = snapshot.own {
        tree.state_mut(node).restore(own);
        report.restored += 1;
    }

    let Some(children) = snapshot.children else {
        return;
    };
    for (id, child_snapshot) in children {
        match tree.find_child(node, &id) {
            ChildMatch::Unique(child) => redistribute_into(tree, child, child_snapshot, report),
            ChildMatch::Missing => {
                tracing::debug!(parent = %tree.unique_id(node), child = %id, "Parking state for missing child");
                tree.park(node, id, child_snapshot);
                report.parked += 1;
            }
            ChildMatch::Ambiguous(count) => {
                tracing::debug!(
                    parent = %tree.unique_id(node),
                    child = %id,
                    count,
                    "Skipping state for ambiguous child id"
                );
                report.ambiguous += 1;
            }
        }
    }
}
