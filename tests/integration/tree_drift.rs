//! Collect and redistribute across rebuilt trees, with and without drift

use super::common::fixtures::{edited_profile_form, profile_form, Shape};
use postback::codec::{StateFormatter, Value};
use postback::state::Snapshot;
use postback::tree::{collect, redistribute};

/// Collect from the edited form and push the snapshot through the codec.
fn wire_snapshot() -> Option<Snapshot> {
    let (tree, _) = edited_profile_form();
    let snapshot = collect(&tree, tree.root())?;
    let formatter = StateFormatter::new();
    let bytes = formatter.serialize(&snapshot.to_value()).unwrap();
    Some(Snapshot::from_value(formatter.deserialize(&bytes).unwrap()).unwrap())
}

#[test]
fn test_identical_structure_restores_everything() {
    let snapshot = wire_snapshot();
    let (mut tree, form) = profile_form(Shape::Full);
    let root = tree.root();
    let report = redistribute(&mut tree, root, snapshot);

    assert_eq!(report.restored, 4);
    assert_eq!(tree.get(form.name, "text"), Some(&Value::from("Ada")));
    assert_eq!(
        tree.get(form.email.unwrap(), "text"),
        Some(&Value::from("ada@example.com"))
    );
    assert_eq!(tree.get(form.newsletter, "checked"), Some(&Value::Bool(true)));
    assert_eq!(tree.get(form.footer, "text"), Some(&Value::from("(c) edited")));
}

#[test]
fn test_restore_without_tracking_collects_nothing() {
    let snapshot = wire_snapshot();
    let (mut tree, _) = profile_form(Shape::Full);
    let root = tree.root();
    redistribute(&mut tree, root, snapshot);
    assert!(collect(&tree, tree.root()).is_none());
}

#[test]
fn test_restore_after_tracking_reproduces_snapshot() {
    let snapshot = wire_snapshot();
    let (mut tree, _) = profile_form(Shape::Full);
    tree.track_subtree(tree.root());
    let root = tree.root();
    redistribute(&mut tree, root, snapshot.clone());
    assert_eq!(collect(&tree, tree.root()), snapshot);
}

#[test]
fn test_removed_child_is_tolerated() {
    let snapshot = wire_snapshot();
    let (mut tree, form) = profile_form(Shape::WithoutEmail);
    let root = tree.root();
    let report = redistribute(&mut tree, root, snapshot);

    assert_eq!(report.parked, 1);
    assert_eq!(tree.get(form.name, "text"), Some(&Value::from("Ada")));
    assert_eq!(tree.get(form.newsletter, "checked"), Some(&Value::Bool(true)));
    assert_eq!(tree.parked_ids(form.profile), vec!["email"]);
}

#[test]
fn test_renamed_child_keeps_its_defaults() {
    let snapshot = wire_snapshot();
    let (mut tree, form) = profile_form(Shape::RenamedEmail);
    let root = tree.root();
    redistribute(&mut tree, root, snapshot);

    assert_eq!(tree.get(form.email.unwrap(), "text"), Some(&Value::from("")));
    assert_eq!(tree.get(form.name, "text"), Some(&Value::from("Ada")));
}

#[test]
fn test_reordered_children_match_by_id() {
    let snapshot = wire_snapshot();
    let (mut tree, form) = profile_form(Shape::Reordered);
    let root = tree.root();
    let report = redistribute(&mut tree, root, snapshot);

    assert_eq!(report.parked, 0);
    assert_eq!(tree.get(form.name, "text"), Some(&Value::from("Ada")));
    assert_eq!(tree.get(form.newsletter, "checked"), Some(&Value::Bool(true)));
}

#[test]
fn test_absent_snapshot_leaves_defaults() {
    let (mut tree, form) = profile_form(Shape::Full);
    let root = tree.root();
    let report = redistribute(&mut tree, root, None);
    assert_eq!(report.restored, 0);
    assert_eq!(tree.get(form.name, "text"), Some(&Value::from("")));
}

#[test]
fn test_generated_ids_line_up_across_rebuilds() {
    let (tree, form) = profile_form(Shape::Full);
    assert_eq!(tree.unique_id(form.footer), "ctl0");
    assert_eq!(tree.unique_id(form.name), "profile$name");
}
