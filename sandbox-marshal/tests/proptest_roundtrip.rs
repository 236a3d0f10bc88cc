//! Property: any JSON value survives a host -> guest -> host round trip
//! unchanged, and leaves no handle behind once disposed.

use boa_engine::Context;
use proptest::prelude::*;
use sandbox_marshal::{to_guest, to_host, HandleTable};
use serde_json::Value;

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| Value::Number(n.into())),
        ".{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map(".{1,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn round_trips_without_leaking_handles(value in arb_json()) {
        let mut ctx = Context::default();
        let table = HandleTable::new();
        let handle = to_guest(&mut ctx, &table, &value);
        let back = to_host(&mut ctx, &handle).unwrap();
        prop_assert_eq!(&back, &value);
        handle.dispose().unwrap();
        prop_assert_eq!(table.live_count(), 0);
    }
}
