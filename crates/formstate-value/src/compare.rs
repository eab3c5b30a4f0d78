//! Structural equality and leaf-level diffs.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::path::FieldPath;
use crate::value::{Map, Node, Value};

/// Structural equality of two trees.
///
/// Walks both trees with a work-list. A pair of nodes already under
/// comparison is assumed equal when met again, which makes cyclic trees
/// terminate.
pub fn deep_equal(left: &Value, right: &Value) -> bool {
    let mut work = vec![(left.clone(), right.clone())];
    let mut seen: HashSet<(usize, usize)> = HashSet::new();

    while let Some((a, b)) = work.pop() {
        match (&a, &b) {
            (Value::Map(x), Value::Map(y)) => {
                if Node::ptr_eq(x, y) || !seen.insert((x.addr(), y.addr())) {
                    continue;
                }
                let (lhs, rhs) = (x.read(), y.read());
                if lhs.len() != rhs.len() {
                    return false;
                }
                for ((key_a, value_a), (key_b, value_b)) in lhs.iter().zip(rhs.iter()) {
                    if key_a != key_b {
                        return false;
                    }
                    work.push((value_a.clone(), value_b.clone()));
                }
            }
            (Value::List(x), Value::List(y)) => {
                if Node::ptr_eq(x, y) || !seen.insert((x.addr(), y.addr())) {
                    continue;
                }
                let (lhs, rhs) = (x.read(), y.read());
                if lhs.len() != rhs.len() {
                    return false;
                }
                work.extend(lhs.iter().cloned().zip(rhs.iter().cloned()));
            }
            _ => {
                if !scalar_equal(&a, &b) {
                    return false;
                }
            }
        }
    }
    true
}

fn scalar_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Date(x), Value::Date(y)) => x == y,
        (Value::Pattern(x), Value::Pattern(y)) => x == y,
        _ => false,
    }
}

fn optional_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => deep_equal(x, y),
        _ => false,
    }
}

/// Every leaf that differs between `initial` and `current`.
///
/// With `nested` set, mappings are walked in parallel and results are keyed
/// by escaped dot paths (`"contact.email"`). Without it only top-level keys
/// are compared and used verbatim. Arrays are compared as whole leaves. A
/// leaf missing from `current` is reported as null.
///
/// A subtree reachable from two parents is reported under both paths. Only
/// a pair of nodes that is its own ancestor is skipped.
pub fn changed_leaves(initial: &Value, current: &Value, nested: bool) -> BTreeMap<String, Value> {
    let mut changed = BTreeMap::new();
    let mut ancestors: HashSet<NodePair> = HashSet::new();
    let mut work = vec![Step::Visit {
        path: None,
        before: Some(initial.clone()),
        after: Some(current.clone()),
    }];

    while let Some(step) = work.pop() {
        let (path, before, after) = match step {
            Step::Leave(pair) => {
                ancestors.remove(&pair);
                continue;
            }
            Step::Visit {
                path,
                before,
                after,
            } => (path, before, after),
        };
        let containers = match (&before, &after) {
            (Some(Value::Map(a)), Some(Value::Map(b))) => Some((Some(a.clone()), Some(b.clone()))),
            (Some(Value::Map(a)), None) => Some((Some(a.clone()), None)),
            (None, Some(Value::Map(b))) => Some((None, Some(b.clone()))),
            _ => None,
        };
        let may_descend = path.is_none() || nested;

        if let (true, Some((left, right))) = (may_descend, containers) {
            let pair = (left.as_ref().map(Node::addr), right.as_ref().map(Node::addr));
            if !ancestors.insert(pair) {
                continue;
            }
            work.push(Step::Leave(pair));

            let left: Map = left.map(|node| node.read().clone()).unwrap_or_default();
            let right: Map = right.map(|node| node.read().clone()).unwrap_or_default();
            let keys: BTreeSet<&String> = left.keys().chain(right.keys()).collect();

            if keys.is_empty() {
                // An empty mapping that exists on one side only is itself a change.
                if let (Some(path), false) = (&path, before.is_some() && after.is_some()) {
                    changed.insert(leaf_key(path, nested), after.unwrap_or_default());
                }
                continue;
            }

            for key in keys {
                let child = match &path {
                    Some(parent) => parent.child(key),
                    None => FieldPath::key(key),
                };
                work.push(Step::Visit {
                    path: Some(child),
                    before: left.get(key).cloned(),
                    after: right.get(key).cloned(),
                });
            }
            continue;
        }

        let Some(path) = path else {
            continue;
        };
        if !optional_equal(before.as_ref(), after.as_ref()) {
            changed.insert(leaf_key(&path, nested), after.unwrap_or_default());
        }
    }
    changed
}

type NodePair = (Option<usize>, Option<usize>);

enum Step {
    Visit {
        path: Option<FieldPath>,
        before: Option<Value>,
        after: Option<Value>,
    },
    /// Every child of the pair has been visited.
    Leave(NodePair),
}

fn leaf_key(path: &FieldPath, nested: bool) -> String {
    if nested {
        path.to_string()
    } else {
        path.segments().join(".")
    }
}
