//! Multi-request round trips through the page driver

use std::sync::Arc;

use super::common::fixtures::{profile_form, ProfileForm, Shape};
use super::common::post_back;
use postback::codec::Value;
use postback::error::{CorruptionKind, StateError};
use postback::page::{MacProtector, Page, PageOptions, PostedFields, StatePersister};

const LAYOUT: &str = "profile@1";

fn page(persister: &Arc<StatePersister>, shape: Shape) -> (Page, ProfileForm) {
    let (tree, form) = profile_form(shape);
    (Page::new(tree, LAYOUT, Arc::clone(persister)), form)
}

#[test]
fn test_edits_persist_across_requests_without_retouching() {
    let persister = Arc::new(StatePersister::default());

    let (mut first, form) = page(&persister, Shape::Full);
    first.load(&PostedFields::default()).unwrap();
    first.tree_mut().set(form.name, "text", "Ada");
    let fields = first.save().unwrap();

    // Two further requests that change nothing still carry the edit.
    let mut fields = fields;
    for _ in 0..2 {
        let (mut next, form) = page(&persister, Shape::Full);
        next.load(&post_back(&fields)).unwrap();
        assert_eq!(next.tree().get(form.name, "text"), Some(&Value::from("Ada")));
        fields = next.save().unwrap();
    }
}

#[test]
fn test_structural_drift_between_requests() {
    let persister = Arc::new(StatePersister::default());

    let (mut first, form) = page(&persister, Shape::Full);
    first.load(&PostedFields::default()).unwrap();
    first.tree_mut().set(form.name, "text", "Ada");
    first.tree_mut().set(form.email.unwrap(), "text", "ada@example.com");
    let fields = first.save().unwrap();

    let (mut next, form) = page(&persister, Shape::WithoutEmail);
    let report = next.load(&post_back(&fields)).unwrap();
    assert_eq!(report.redistributed.parked, 1);
    assert_eq!(next.tree().get(form.name, "text"), Some(&Value::from("Ada")));
}

#[test]
fn test_mac_protected_round_trip_and_tamper_detection() {
    let persister = Arc::new(
        StatePersister::default().with_protector(Arc::new(MacProtector::new(b"server key"))),
    );

    let (mut first, form) = page(&persister, Shape::Full);
    first.load(&PostedFields::default()).unwrap();
    first.tree_mut().set(form.newsletter, "checked", true);
    let fields = first.save().unwrap();

    let (mut next, form) = page(&persister, Shape::Full);
    next.load(&post_back(&fields)).unwrap();
    assert_eq!(next.tree().get(form.newsletter, "checked"), Some(&Value::Bool(true)));

    let mut tampered = post_back(&fields);
    let state = tampered.state.take().unwrap();
    let flipped = if state.starts_with('A') { "B" } else { "A" };
    tampered.state = Some(format!("{flipped}{}", &state[1..]));
    let (mut attacked, _) = page(&persister, Shape::Full);
    assert!(matches!(
        attacked.load(&tampered),
        Err(StateError::Corrupted(CorruptionKind::IntegrityCheckFailed))
    ));
}

#[test]
fn test_disabled_persistence_saves_no_snapshot() {
    let persister = Arc::new(StatePersister::default());
    let options = PageOptions {
        state_enabled: false,
        event_validation: true,
    };

    let (tree, form) = profile_form(Shape::Full);
    let mut first = Page::new(tree, LAYOUT, Arc::clone(&persister)).with_options(options);
    first.load(&PostedFields::default()).unwrap();
    first.tree_mut().set(form.name, "text", "Ada");
    let fields = first.save().unwrap();

    assert_eq!(
        persister.decode(&fields.state).unwrap(),
        Value::pair(Value::Null, Value::pair(LAYOUT, Value::Null))
    );
}

#[test]
fn test_missing_validation_field_rejects_every_interaction() {
    let persister = Arc::new(StatePersister::default());
    let (mut first, _) = page(&persister, Shape::Full);
    first.load(&PostedFields::default()).unwrap();
    first.register_interaction("profile$save", None);
    let fields = first.save().unwrap();

    let (mut next, _) = page(&persister, Shape::Full);
    next.load(&PostedFields {
        state: Some(fields.state),
        validation: None,
    })
    .unwrap();
    assert!(next.validate_interaction("profile$save", None).is_err());
}

#[test]
fn test_control_state_follows_unique_ids_across_rebuilds() {
    let persister = Arc::new(StatePersister::default());

    let (mut first, form) = page(&persister, Shape::Full);
    first.require_control_state(form.newsletter);
    first.require_control_state(form.email.unwrap());
    first.load(&PostedFields::default()).unwrap();
    first.tree_mut().set_control_state(form.newsletter, "weekly");
    first.tree_mut().set_control_state(form.email.unwrap(), "verified");
    let fields = first.save().unwrap();

    let (mut reordered, form) = page(&persister, Shape::Reordered);
    reordered.require_control_state(form.newsletter);
    reordered.require_control_state(form.email.unwrap());
    let report = reordered.load(&post_back(&fields)).unwrap();
    assert_eq!(report.control_restored, 2);
    assert_eq!(
        reordered.tree().control_state(form.newsletter),
        Some(&Value::from("weekly"))
    );

    let (mut renamed, form) = page(&persister, Shape::RenamedEmail);
    renamed.require_control_state(form.email.unwrap());
    let report = renamed.load(&post_back(&fields)).unwrap();
    assert_eq!(report.control_restored, 0);
    assert_eq!(renamed.tree().control_state(form.email.unwrap()), None);
}
