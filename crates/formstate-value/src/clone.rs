//! Iterative deep clone.
//!
//! The walk uses an explicit work-list rather than recursion, so depth is
//! bounded by heap, not by the call stack. Every source node is cloned exactly
//! once: a node reachable from two parents (or from itself) maps to a single
//! cloned node, preserving the shape of the original graph.

use std::collections::HashMap;

use crate::value::{Map, Node, Value};

/// Copy `value` so that the result shares no mapping or array node with it.
///
/// Scalars, dates and patterns are immutable and copied as-is.
pub fn deep_clone(value: &Value) -> Value {
    let mut cloner = Cloner::default();
    let root = cloner.shell(value);
    while let Some((source, target)) = cloner.work.pop() {
        cloner.fill(&source, &target);
    }
    root
}

#[derive(Default)]
struct Cloner {
    /// Source node address to its clone.
    visited: HashMap<usize, Value>,
    /// Cloned nodes whose children still have to be copied.
    work: Vec<(Value, Value)>,
}

impl Cloner {
    /// Return the clone for `value`, allocating an empty node the first time a
    /// container is seen. Children are filled in later from the work-list.
    fn shell(&mut self, value: &Value) -> Value {
        let (addr, empty) = match value {
            Value::Map(node) => (node.addr(), Value::Map(Node::new(Map::new()))),
            Value::List(node) => (node.addr(), Value::List(Node::new(Vec::new()))),
            scalar => return scalar.clone(),
        };
        if let Some(existing) = self.visited.get(&addr) {
            return existing.clone();
        }
        self.visited.insert(addr, empty.clone());
        self.work.push((value.clone(), empty.clone()));
        empty
    }

    fn fill(&mut self, source: &Value, target: &Value) {
        match (source, target) {
            (Value::Map(from), Value::Map(to)) => {
                let entries: Vec<(String, Value)> = from
                    .read()
                    .iter()
                    .map(|(key, child)| (key.clone(), child.clone()))
                    .collect();
                let cloned: Map = entries
                    .into_iter()
                    .map(|(key, child)| (key, self.shell(&child)))
                    .collect();
                *to.write() = cloned;
            }
            (Value::List(from), Value::List(to)) => {
                let items: Vec<Value> = from.read().clone();
                let cloned: Vec<Value> = items.iter().map(|child| self.shell(child)).collect();
                *to.write() = cloned;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: Vec<(&str, Value)>) -> Value {
        Value::from_map(entries.into_iter().map(|(k, v)| (k.to_owned(), v)).collect())
    }

    #[test]
    fn test_clone_is_independent() {
        let original = map(vec![("name", Value::from("Tornillo")), ("tags", Value::from_list(vec![Value::from("m8")]))]);
        let copy = deep_clone(&original);

        assert_eq!(copy, original);
        assert!(!Value::ptr_eq(&copy, &original));
        assert!(!Value::ptr_eq(
            &copy.get("tags").unwrap(),
            &original.get("tags").unwrap()
        ));
    }

    #[test]
    fn test_scalar_root_is_copied() {
        assert_eq!(deep_clone(&Value::from(3.5)), Value::from(3.5));
        assert_eq!(deep_clone(&Value::Null), Value::Null);
    }

    #[test]
    fn test_self_reference_is_preserved() {
        let node = Node::new(Map::new());
        let root = Value::Map(node.clone());
        node.write().insert("me".into(), root.clone());

        let copy = deep_clone(&root);
        let inner = copy.get("me").unwrap();
        assert!(Value::ptr_eq(&copy, &inner));
        assert!(!Value::ptr_eq(&copy, &root));

        // Break the cycles so the test does not leak.
        node.write().clear();
        if let Some(copied) = copy.as_map() {
            copied.write().clear();
        }
    }

    /// Unlink a chain one level at a time; dropping it whole would recurse.
    fn dismantle(value: Value) {
        let mut current = Some(value);
        while let Some(level) = current.take() {
            if let Value::Map(node) = &level {
                current = node.write().remove("next");
            }
        }
    }

    #[test]
    fn test_very_deep_tree_does_not_overflow() {
        let mut value = Value::from("leaf");
        for _ in 0..100_000 {
            value = map(vec![("next", value)]);
        }
        let copy = deep_clone(&value);
        assert!(copy.is_map());
        assert!(!Value::ptr_eq(&copy, &value));

        dismantle(copy);
        dismantle(value);
    }
}
