//! Round-trip and robustness properties of the state codec

use super::common::values;
use postback::codec::cache::MAX_ENTRIES;
use postback::codec::{EnumValue, StateFormatter, Value};
use postback::state::{Snapshot, StateDelta};
use proptest::prelude::*;

proptest! {
    #[test]
    fn decode_inverts_encode(value in values::value()) {
        let formatter = StateFormatter::new();
        let bytes = formatter.serialize(&value).unwrap();
        prop_assert_eq!(formatter.deserialize(&bytes).unwrap(), value);
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = StateFormatter::new().deserialize(&bytes);
    }

    #[test]
    fn valid_prefix_with_garbage_never_panics(tail in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut bytes = vec![0xFF, 0x01];
        bytes.extend_from_slice(&tail);
        let _ = StateFormatter::new().deserialize(&bytes);
    }

    #[test]
    fn truncation_is_always_detected(value in values::value(), cut in any::<prop::sample::Index>()) {
        let formatter = StateFormatter::new();
        let bytes = formatter.serialize(&value).unwrap();
        let len = cut.index(bytes.len());
        prop_assert!(formatter.deserialize(&bytes[..len]).is_err());
    }
}

#[test]
fn repeated_strings_compress() {
    let formatter = StateFormatter::new();
    let repeated: Vec<Value> = (0..50).map(|_| Value::from("selected-item")).collect();
    let distinct: Vec<Value> = (0..50)
        .map(|i| Value::from(format!("selected-{i:04}")))
        .collect();

    let repeated_len = formatter.serialize(&Value::List(repeated)).unwrap().len();
    let distinct_len = formatter.serialize(&Value::List(distinct)).unwrap().len();
    assert!(repeated_len * 3 < distinct_len);
}

/// More distinct strings than the back-reference cache holds, followed by
/// repeats of `repeated`.
fn overflowing_list(repeated: &str) -> Value {
    let mut items: Vec<Value> = (0..MAX_ENTRIES + 33)
        .map(|i| Value::from(format!("s{i}")))
        .collect();
    items.extend((0..100).map(|_| Value::from(repeated)));
    Value::List(items)
}

#[test]
fn caches_stay_in_step_past_their_capacity() {
    let formatter = StateFormatter::new();
    let early = "s5".to_string();
    let late = format!("s{}", MAX_ENTRIES + 23);

    for repeated in [&early, &late] {
        let value = overflowing_list(repeated);
        let bytes = formatter.serialize(&value).unwrap();
        assert_eq!(formatter.deserialize(&bytes).unwrap(), value);
    }

    // Early strings are back-referenced; those seen after the cache filled
    // are written literally every time.
    let early_len = formatter.serialize(&overflowing_list(&early)).unwrap().len();
    let late_len = formatter.serialize(&overflowing_list(&late)).unwrap().len();
    assert!(early_len < late_len);

    let mut items = match overflowing_list(&early) {
        Value::List(items) => items,
        _ => unreachable!(),
    };
    items.push(EnumValue::new("Alignment", 2).into());
    items.push(EnumValue::new("Alignment", 3).into());
    let value = Value::List(items);
    let bytes = formatter.serialize(&value).unwrap();
    assert_eq!(formatter.deserialize(&bytes).unwrap(), value);
}

#[test]
fn snapshot_survives_the_codec() {
    let mut own = StateDelta::new();
    own.push("text", Value::from("Ada"));
    own.push("checked", Value::Bool(true));
    let snapshot = Snapshot {
        own: Some(own),
        children: None,
    };

    let formatter = StateFormatter::new();
    let bytes = formatter.serialize(&snapshot.to_value()).unwrap();
    let back = Snapshot::from_value(formatter.deserialize(&bytes).unwrap()).unwrap();
    assert_eq!(back, snapshot);
}
