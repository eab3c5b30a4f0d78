//! Path-addressed reads and copy-on-write updates.
//!
//! Writes never touch the input tree: they deep-clone it first and return the
//! updated copy. A tree handed out earlier is therefore a stable snapshot.

use tracing::debug;

use crate::clone::deep_clone;
use crate::path::FieldPath;
use crate::value::{Map, Node, Value};

/// Read the value at `path`.
///
/// Returns `None` when a segment is missing or an intermediate value is not a
/// mapping. The result shares nodes with `tree`.
pub fn get_nested_value(tree: &Value, path: &FieldPath) -> Option<Value> {
    let mut current = tree.clone();
    for segment in path.segments() {
        let next = match &current {
            Value::Map(node) => node.read().get(segment).cloned(),
            _ => None,
        };
        current = next?;
    }
    Some(current)
}

/// Return a copy of `tree` with `value` stored at `path`.
///
/// Missing intermediate mappings are created. An intermediate that exists but
/// is not a mapping is replaced by an empty mapping, discarding the old value.
/// A root that is not a mapping is treated the same way.
pub fn set_nested_value(tree: &Value, path: &FieldPath, value: Value) -> Value {
    let root = root_map(deep_clone(tree));
    let (leaf, parents) = path.split_last();

    let mut cursor = root.clone();
    for segment in parents {
        let existing = cursor.read().get(segment).cloned();
        let next = match existing {
            Some(Value::Map(node)) => node,
            other => {
                if let Some(replaced) = other.filter(|v| !v.is_null()) {
                    debug!(
                        path = %path,
                        segment = %segment,
                        replaced = replaced.kind_name(),
                        "replacing non-mapping intermediate with an empty mapping"
                    );
                }
                let node = Node::new(Map::new());
                cursor
                    .write()
                    .insert(segment.clone(), Value::Map(node.clone()));
                node
            }
        };
        cursor = next;
    }
    cursor.write().insert(leaf.to_owned(), value);
    Value::Map(root)
}

/// Return a copy of `tree` without the entry at `path`.
///
/// A path that does not resolve leaves the copy unchanged.
pub fn delete_nested_field(tree: &Value, path: &FieldPath) -> Value {
    let copy = deep_clone(tree);
    let (leaf, parents) = path.split_last();

    let mut cursor = match &copy {
        Value::Map(node) => node.clone(),
        _ => return copy,
    };
    for segment in parents {
        let next = cursor.read().get(segment).cloned();
        match next {
            Some(Value::Map(node)) => cursor = node,
            _ => return copy,
        }
    }
    cursor.write().remove(leaf);
    copy
}

fn root_map(tree: Value) -> Node<Map> {
    match tree {
        Value::Map(node) => node,
        Value::Null => Node::new(Map::new()),
        other => {
            debug!(
                replaced = other.kind_name(),
                "replacing non-mapping root with an empty mapping"
            );
            Node::new(Map::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(name: &str) -> FieldPath {
        FieldPath::parse(name).unwrap()
    }

    #[test]
    fn test_reads_nested_leaf() {
        let tree = Value::from(json!({"contact": {"email": "a@b.co"}}));
        assert_eq!(
            get_nested_value(&tree, &path("contact.email")),
            Some(Value::from("a@b.co"))
        );
        assert_eq!(get_nested_value(&tree, &path("contact.phone")), None);
        assert_eq!(get_nested_value(&tree, &path("contact.email.domain")), None);
    }

    #[test]
    fn test_write_creates_intermediates() {
        let tree = Value::empty_map();
        let updated = set_nested_value(&tree, &path("location.shelf.bin"), Value::from("B4"));

        assert_eq!(updated, Value::from(json!({"location": {"shelf": {"bin": "B4"}}})));
        assert_eq!(tree, Value::empty_map());
    }

    #[test]
    fn test_write_replaces_scalar_intermediate() {
        let tree = Value::from(json!({"location": "warehouse"}));
        let updated = set_nested_value(&tree, &path("location.bin"), Value::from("B4"));
        assert_eq!(updated, Value::from(json!({"location": {"bin": "B4"}})));
    }

    #[test]
    fn test_write_leaves_siblings_alone() {
        let tree = Value::from(json!({"contact": {"email": "", "phone": "099"}}));
        let updated = set_nested_value(&tree, &path("contact.email"), Value::from("x@y.z"));
        assert_eq!(
            updated,
            Value::from(json!({"contact": {"email": "x@y.z", "phone": "099"}}))
        );
        assert!(!Value::ptr_eq(&tree, &updated));
    }

    #[test]
    fn test_delete_removes_leaf() {
        let tree = Value::from(json!({"contact": {"email": "", "phone": "099"}}));
        let updated = delete_nested_field(&tree, &path("contact.phone"));
        assert_eq!(updated, Value::from(json!({"contact": {"email": ""}})));

        let unchanged = delete_nested_field(&tree, &path("missing.leaf"));
        assert_eq!(unchanged, tree);
    }

    #[test]
    fn test_literal_key_with_dot() {
        let tree = Value::empty_map();
        let key = FieldPath::literal("contact.email").unwrap();
        let updated = set_nested_value(&tree, &key, Value::from("x"));
        assert_eq!(updated.get("contact.email"), Some(Value::from("x")));
        assert_eq!(updated.get("contact"), None);
    }
}
