use formstate_value::{
    FieldPath, Map, Value, deep_clone, deep_equal, delete_nested_field, get_nested_value,
    set_nested_value,
};
use proptest::prelude::*;
use serde_json::{Value as JsonValue, json};

fn json_tree() -> impl Strategy<Value = JsonValue> {
    let leaf = prop_oneof![
        Just(JsonValue::Null),
        any::<bool>().prop_map(JsonValue::from),
        (-1000i64..1000).prop_map(JsonValue::from),
        "[a-z ]{0,6}".prop_map(JsonValue::from),
    ];
    leaf.prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(JsonValue::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|entries| JsonValue::Object(entries.into_iter().collect())),
        ]
    })
}

/// Walk two trees of the same shape and fail if any container is shared.
fn assert_disjoint(a: &Value, b: &Value) {
    match (a, b) {
        (Value::Map(x), Value::Map(y)) => {
            assert!(!Value::ptr_eq(a, b), "mapping node shared between trees");
            let (x, y) = (x.read().clone(), y.read().clone());
            for (key, child) in &x {
                assert_disjoint(child, &y[key]);
            }
        }
        (Value::List(x), Value::List(y)) => {
            assert!(!Value::ptr_eq(a, b), "array node shared between trees");
            let (x, y) = (x.read().clone(), y.read().clone());
            for (left, right) in x.iter().zip(y.iter()) {
                assert_disjoint(left, right);
            }
        }
        _ => {}
    }
}

proptest! {
    #[test]
    fn test_clone_equals_and_shares_nothing(json in json_tree()) {
        let original = Value::from(json.clone());
        let copy = deep_clone(&original);

        prop_assert!(deep_equal(&original, &copy));
        prop_assert_eq!(copy.to_json().unwrap(), json);
        assert_disjoint(&original, &copy);
    }

    #[test]
    fn test_nested_write_then_read(
        segments in prop::collection::vec("[a-z.\\\\]{1,5}", 1..6),
        leaf in "[a-zA-Z0-9 ]{0,8}",
        base in json_tree(),
    ) {
        let path = FieldPath::from_segments(segments).unwrap();
        let tree = Value::from(base);
        let before = deep_clone(&tree);

        let updated = set_nested_value(&tree, &path, Value::from(leaf.as_str()));
        prop_assert_eq!(get_nested_value(&updated, &path), Some(Value::from(leaf.as_str())));
        prop_assert!(deep_equal(&tree, &before));
    }

    #[test]
    fn test_display_parses_back(segments in prop::collection::vec("[a-z.\\\\]{1,5}", 1..6)) {
        let path = FieldPath::from_segments(segments).unwrap();
        let reparsed = FieldPath::parse(&path.to_string()).unwrap();
        prop_assert_eq!(reparsed, path);
    }
}

#[test]
fn test_shared_subtree_keeps_one_identity() {
    let address = Value::from(json!({"city": "Quito"}));
    let mut entries = Map::new();
    entries.insert("billing".into(), address.clone());
    entries.insert("shipping".into(), address);
    let original = Value::from_map(entries);

    let copy = deep_clone(&original);
    let billing = copy.get("billing").unwrap();
    let shipping = copy.get("shipping").unwrap();
    assert!(Value::ptr_eq(&billing, &shipping));

    let path = FieldPath::parse("billing.city").unwrap();
    let updated = set_nested_value(&copy, &path, Value::from("Cuenca"));

    assert_eq!(
        updated.get("shipping").unwrap().get("city"),
        Some(Value::from("Cuenca"))
    );
    assert_eq!(
        copy.get("shipping").unwrap().get("city"),
        Some(Value::from("Quito"))
    );
    assert_eq!(
        original.get("shipping").unwrap().get("city"),
        Some(Value::from("Quito"))
    );
}

#[test]
fn test_deep_path_round_trip() {
    let path = FieldPath::parse("a.b.c.d").unwrap();
    let updated = set_nested_value(&Value::empty_map(), &path, Value::from(42));
    assert_eq!(get_nested_value(&updated, &path), Some(Value::from(42)));
    assert_eq!(updated.to_json().unwrap(), json!({"a": {"b": {"c": {"d": 42}}}}));
}

#[test]
fn test_delete_then_read_is_absent() {
    let tree = Value::from(json!({"stock": {"min": 1, "max": 9}}));
    let path = FieldPath::parse("stock.min").unwrap();
    let updated = delete_nested_field(&tree, &path);
    assert_eq!(get_nested_value(&updated, &path), None);
    assert_eq!(get_nested_value(&tree, &path), Some(Value::from(1)));
}
