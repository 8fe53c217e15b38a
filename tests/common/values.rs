//! Proptest strategies for value graphs

use chrono::DateTime;
use postback::codec::{
    EnumValue, ObjectArray, OpaqueValue, PrimitiveArray, TypeName, Value, ValueMap,
};
use proptest::prelude::*;

fn type_name() -> impl Strategy<Value = TypeName> {
    "[A-Z][a-z]{0,7}".prop_map(TypeName::new)
}

fn finite_f64() -> impl Strategy<Value = f64> {
    -1.0e12f64..1.0e12
}

fn primitive_array() -> impl Strategy<Value = PrimitiveArray> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..16).prop_map(PrimitiveArray::Bytes),
        prop::collection::vec(any::<bool>(), 0..16).prop_map(PrimitiveArray::Bools),
        prop::collection::vec(any::<i16>(), 0..16).prop_map(PrimitiveArray::Int16),
        prop::collection::vec(any::<i32>(), 0..16).prop_map(PrimitiveArray::Int32),
        prop::collection::vec(any::<i64>(), 0..16).prop_map(PrimitiveArray::Int64),
        prop::collection::vec(finite_f64(), 0..16).prop_map(PrimitiveArray::Doubles),
        prop::collection::vec(any::<char>(), 0..16).prop_map(PrimitiveArray::Chars),
    ]
}

/// Scalar shapes. Strings come from a small alphabet so repeats, and with
/// them back-references, are common.
pub fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i16>().prop_map(Value::Int16),
        any::<i32>().prop_map(Value::Int32),
        any::<i64>().prop_map(Value::Int64),
        finite_f64().prop_map(Value::Double),
        any::<char>().prop_map(Value::Char),
        "[ab]{0,3}".prop_map(Value::Str),
        any::<String>().prop_map(Value::Str),
        (-10_000_000_000i64..10_000_000_000, 0u32..1_000_000_000).prop_map(|(secs, nanos)| {
            DateTime::from_timestamp(secs, nanos)
                .map(Value::Timestamp)
                .unwrap_or(Value::Null)
        }),
        type_name().prop_map(Value::Type),
        (type_name(), any::<i64>()).prop_map(|(t, v)| Value::Enum(EnumValue::new(t, v))),
        primitive_array().prop_map(Value::PrimitiveArray),
        (type_name(), prop::collection::vec(any::<u8>(), 0..16))
            .prop_map(|(t, bytes)| Value::Opaque(OpaqueValue::new(t, bytes))),
    ]
}

/// Arbitrary nested graphs.
pub fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Value::pair(a, b)),
            (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(a, b, c)| Value::triplet(a, b, c)),
            prop::collection::vec(("[a-d]{1,2}", inner.clone()), 0..5).prop_map(|entries| {
                Value::Map(
                    entries
                        .into_iter()
                        .map(|(k, v)| (Value::Str(k), v))
                        .collect::<ValueMap>(),
                )
            }),
            (type_name(), prop::collection::vec(inner, 0..4)).prop_map(|(element_type, items)| {
                Value::ObjectArray(ObjectArray {
                    element_type,
                    items,
                })
            }),
        ]
    })
}
