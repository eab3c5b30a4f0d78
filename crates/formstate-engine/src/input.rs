//! Input kinds and change normalization.

use formstate_value::Value;
use serde::{Deserialize, Serialize};

/// The kind of widget a change came from.
///
/// Only the normalization class matters to the engine: checkbox-like kinds
/// store booleans, numeric kinds store numbers, multi-value kinds store
/// arrays, and everything else stores text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    #[default]
    Text,
    Textarea,
    Email,
    Password,
    Search,
    Select,
    Radio,
    Date,
    Checkbox,
    Switch,
    Number,
    Range,
    MultiSelect,
    MultiFile,
}

impl InputKind {
    /// Returns true for kinds whose value is a checked state.
    pub fn is_boolean(self) -> bool {
        matches!(self, Self::Checkbox | Self::Switch)
    }

    /// Returns true for kinds whose value is a number.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Number | Self::Range)
    }

    /// Returns true for kinds whose value is the list of selected entries.
    pub fn is_multiple(self) -> bool {
        matches!(self, Self::MultiSelect | Self::MultiFile)
    }
}

/// Convert a raw widget value into what the form stores.
///
/// Numeric input that does not parse is stored as the empty string, never as
/// NaN. Text is trimmed when `trim` is set.
pub fn normalize(raw: Value, kind: InputKind, trim: bool) -> Value {
    if kind.is_boolean() {
        return match raw {
            Value::Bool(_) => raw,
            Value::String(s) => Value::Bool(matches!(s.as_str(), "true" | "on" | "1")),
            other => Value::Bool(other.is_truthy()),
        };
    }

    if kind.is_numeric() {
        let parsed = match &raw {
            Value::Number(n) => Some(*n),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        return match parsed {
            Some(n) if n.is_finite() => Value::Number(n),
            _ => Value::from(""),
        };
    }

    if kind.is_multiple() {
        return match raw {
            Value::List(_) => raw,
            Value::Null => Value::from_list(Vec::new()),
            single => Value::from_list(vec![single]),
        };
    }

    match raw {
        Value::String(s) if trim => Value::String(s.trim().to_owned()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkbox_passthrough() {
        assert_eq!(normalize(Value::Bool(true), InputKind::Checkbox, true), Value::Bool(true));
        assert_eq!(normalize(Value::from("on"), InputKind::Switch, true), Value::Bool(true));
        assert_eq!(normalize(Value::Null, InputKind::Checkbox, true), Value::Bool(false));
    }

    #[test]
    fn test_numeric_parse_or_empty() {
        assert_eq!(normalize(Value::from(" 12.5 "), InputKind::Number, true), Value::from(12.5));
        assert_eq!(normalize(Value::from("12a"), InputKind::Number, true), Value::from(""));
        assert_eq!(normalize(Value::from(""), InputKind::Range, true), Value::from(""));
        assert_eq!(normalize(Value::from(f64::NAN), InputKind::Number, true), Value::from(""));
    }

    #[test]
    fn test_multiple_becomes_list() {
        let list = normalize(Value::from("a"), InputKind::MultiSelect, true);
        assert_eq!(list, Value::from_list(vec![Value::from("a")]));
        let empty = normalize(Value::Null, InputKind::MultiFile, true);
        assert_eq!(empty, Value::from_list(Vec::new()));
    }

    #[test]
    fn test_text_trim_is_optional() {
        assert_eq!(normalize(Value::from("  x "), InputKind::Text, true), Value::from("x"));
        assert_eq!(normalize(Value::from("  x "), InputKind::Text, false), Value::from("  x "));
    }
}
