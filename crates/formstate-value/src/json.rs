//! Conversion between [`Value`] and `serde_json`.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

use crate::error::ValueError;
use crate::value::{Map, Value};

/// Largest magnitude below which an integral float is emitted as a JSON integer.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Deepest tree [`Serialize`] accepts. Serializers recurse once per level.
pub const SERIALIZE_DEPTH_LIMIT: usize = 512;

impl Value {
    /// Convert to a `serde_json` value.
    ///
    /// Dates become RFC 3339 strings, patterns their source, and non-finite
    /// numbers `null`.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::Cycle`] if a node contains one of its ancestors.
    pub fn to_json(&self) -> Result<JsonValue, ValueError> {
        build_json(self, None)
    }
}

/// Converts with an explicit stack of partly built containers.
fn build_json(root: &Value, depth_limit: Option<usize>) -> Result<JsonValue, ValueError> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut ancestors: HashSet<usize> = HashSet::new();
    let mut next = root.clone();

    loop {
        let mut done = match Frame::open(next) {
            Opened::Leaf(json) => Some(json),
            Opened::Container(frame) => {
                if !ancestors.insert(frame.addr) {
                    return Err(ValueError::Cycle);
                }
                if let Some(limit) = depth_limit.filter(|limit| stack.len() >= *limit) {
                    return Err(ValueError::TooDeep { limit });
                }
                stack.push(frame);
                None
            }
        };

        loop {
            let Some(top) = stack.last_mut() else {
                return Ok(done.unwrap_or_default());
            };
            if let Some(json) = done.take() {
                top.accept(json);
            }
            if let Some(child) = top.next_child() {
                next = child;
                break;
            }
            if let Some(frame) = stack.pop() {
                ancestors.remove(&frame.addr);
                done = Some(frame.finish());
            }
        }
    }
}

enum Opened {
    Leaf(JsonValue),
    Container(Frame),
}

/// A container whose children are being converted.
struct Frame {
    addr: usize,
    // Holds the node alive so `addr` stays unique.
    _source: Value,
    partial: Partial,
}

enum Partial {
    List {
        items: std::vec::IntoIter<Value>,
        out: Vec<JsonValue>,
    },
    Map {
        entries: std::collections::btree_map::IntoIter<String, Value>,
        key: Option<String>,
        out: JsonMap<String, JsonValue>,
    },
}

impl Frame {
    fn open(value: Value) -> Opened {
        let (addr, partial) = match &value {
            Value::List(node) => {
                let items = node.read().clone();
                let out = Vec::with_capacity(items.len());
                (
                    node.addr(),
                    Partial::List {
                        items: items.into_iter(),
                        out,
                    },
                )
            }
            Value::Map(node) => (
                node.addr(),
                Partial::Map {
                    entries: node.read().clone().into_iter(),
                    key: None,
                    out: JsonMap::new(),
                },
            ),
            scalar => return Opened::Leaf(scalar_to_json(scalar)),
        };
        Opened::Container(Frame {
            addr,
            _source: value,
            partial,
        })
    }

    fn next_child(&mut self) -> Option<Value> {
        match &mut self.partial {
            Partial::List { items, .. } => items.next(),
            Partial::Map { entries, key, .. } => entries.next().map(|(name, child)| {
                *key = Some(name);
                child
            }),
        }
    }

    fn accept(&mut self, json: JsonValue) {
        match &mut self.partial {
            Partial::List { out, .. } => out.push(json),
            Partial::Map { key, out, .. } => {
                out.insert(key.take().unwrap_or_default(), json);
            }
        }
    }

    fn finish(self) -> JsonValue {
        match self.partial {
            Partial::List { out, .. } => JsonValue::Array(out),
            Partial::Map { out, .. } => JsonValue::Object(out),
        }
    }
}

fn scalar_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Date(d) => JsonValue::String(d.to_rfc3339()),
        Value::Pattern(p) => JsonValue::String(p.as_str().to_owned()),
        Value::Null | Value::List(_) | Value::Map(_) => JsonValue::Null,
    }
}

/// Write `value` as compact JSON text without building a `serde_json` tree.
///
/// A node met again below itself is written as `<cycle>`.
pub(crate) fn write_json_text(value: &Value, f: &mut impl fmt::Write) -> fmt::Result {
    enum Emit {
        Value(Value),
        Text(&'static str),
        Key(String),
        Leave(usize),
    }

    let mut ancestors: HashSet<usize> = HashSet::new();
    let mut work = vec![Emit::Value(value.clone())];
    while let Some(emit) = work.pop() {
        match emit {
            Emit::Text(text) => f.write_str(text)?,
            Emit::Key(key) => write!(f, "{}:", JsonValue::String(key))?,
            Emit::Leave(addr) => {
                ancestors.remove(&addr);
            }
            Emit::Value(Value::List(node)) => {
                if !ancestors.insert(node.addr()) {
                    f.write_str("<cycle>")?;
                    continue;
                }
                work.push(Emit::Leave(node.addr()));
                work.push(Emit::Text("]"));
                let items = node.read().clone();
                for (index, item) in items.into_iter().enumerate().rev() {
                    work.push(Emit::Value(item));
                    if index > 0 {
                        work.push(Emit::Text(","));
                    }
                }
                work.push(Emit::Text("["));
            }
            Emit::Value(Value::Map(node)) => {
                if !ancestors.insert(node.addr()) {
                    f.write_str("<cycle>")?;
                    continue;
                }
                work.push(Emit::Leave(node.addr()));
                work.push(Emit::Text("}"));
                let entries: Vec<(String, Value)> = node.read().clone().into_iter().collect();
                for (index, (key, child)) in entries.into_iter().enumerate().rev() {
                    work.push(Emit::Value(child));
                    work.push(Emit::Key(key));
                    if index > 0 {
                        work.push(Emit::Text(","));
                    }
                }
                work.push(Emit::Text("{"));
            }
            Emit::Value(scalar) => write!(f, "{}", scalar_to_json(&scalar))?,
        }
    }
    Ok(())
}

fn number_to_json(n: f64) -> JsonValue {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < MAX_EXACT_INTEGER {
        return JsonValue::from(n as i64);
    }
    Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => {
                Value::from_list(items.into_iter().map(Value::from).collect())
            }
            JsonValue::Object(entries) => Value::from_map(
                entries
                    .into_iter()
                    .map(|(key, child)| (key, Value::from(child)))
                    .collect::<Map>(),
            ),
        }
    }
}

impl From<&JsonValue> for Value {
    fn from(json: &JsonValue) -> Self {
        Value::from(json.clone())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        build_json(self, Some(SERIALIZE_DEPTH_LIMIT))
            .map_err(<S::Error as serde::ser::Error>::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(Value::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Node;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_integral_numbers_stay_integers() {
        let value = Value::from(json!({"qty": 5, "price": 2.5}));
        assert_eq!(value.to_json().unwrap(), json!({"qty": 5, "price": 2.5}));
    }

    #[test]
    fn test_non_finite_numbers_become_null() {
        assert_eq!(Value::from(f64::NAN).to_json().unwrap(), JsonValue::Null);
    }

    #[test]
    fn test_dates_serialize_as_rfc3339() {
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let json = serde_json::to_value(Value::from(date)).unwrap();
        assert_eq!(json, json!("2024-03-01T12:00:00+00:00"));
    }

    #[test]
    fn test_shared_subtree_serializes_twice() {
        let shared = Value::from(json!({"city": "Quito"}));
        let mut entries = Map::new();
        entries.insert("billing".into(), shared.clone());
        entries.insert("shipping".into(), shared);
        let json = Value::from_map(entries).to_json().unwrap();
        assert_eq!(
            json,
            json!({"billing": {"city": "Quito"}, "shipping": {"city": "Quito"}})
        );
    }

    #[test]
    fn test_cycles_are_reported() {
        let node = Node::new(Map::new());
        node.write().insert("loop".into(), Value::Map(node.clone()));
        assert_eq!(Value::Map(node.clone()).to_json(), Err(ValueError::Cycle));
        node.write().clear();
    }

    fn chain(depth: usize) -> Value {
        let mut value = Value::from("leaf");
        for _ in 0..depth {
            let mut entries = Map::new();
            entries.insert("next".into(), value);
            value = Value::from_map(entries);
        }
        value
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

    fn dismantle_json(mut json: JsonValue) -> usize {
        let mut depth = 0;
        loop {
            let child = match &mut json {
                JsonValue::Object(entries) => entries.remove("next"),
                _ => None,
            };
            let Some(child) = child else {
                return depth;
            };
            json = child;
            depth += 1;
        }
    }

    #[test]
    fn test_very_deep_tree_converts_without_overflow() {
        let value = chain(100_000);
        let json = value.to_json().unwrap();
        assert_eq!(dismantle_json(json), 100_000);

        let text = format!("{value:?}");
        assert!(text.starts_with(r#"{"next":{"next":"#));
        assert!(text.ends_with(r#""leaf"}}"#));
        dismantle(value);
    }

    #[test]
    fn test_serialize_refuses_trees_past_the_depth_limit() {
        let shallow = chain(SERIALIZE_DEPTH_LIMIT);
        assert!(serde_json::to_string(&shallow).is_ok());

        let deep = chain(100_000);
        let error = serde_json::to_string(&deep).unwrap_err();
        assert!(error.to_string().contains("nesting limit"));
        dismantle(deep);
    }

    #[test]
    fn test_debug_text_matches_json_text() {
        let value = Value::from(json!({"name": "Ana \"A\"", "tags": ["x", 2, null], "empty": {}}));
        assert_eq!(format!("{value:?}"), value.to_json().unwrap().to_string());
    }

    #[test]
    fn test_debug_marks_cycles_in_place() {
        let node = Node::new(Map::new());
        node.write().insert("loop".into(), Value::Map(node.clone()));
        node.write().insert("name".into(), Value::from("x"));
        assert_eq!(format!("{:?}", Value::Map(node.clone())), r#"{"loop":<cycle>,"name":"x"}"#);
        node.write().clear();
    }
}
