//! Whole-form status snapshot.

use std::collections::BTreeMap;

use formstate_value::Value;
use serde::Serialize;

use crate::engine::{ErrorMap, TouchedSet};

/// Everything a form-level component needs to render, taken at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormStatus {
    pub values: Value,
    pub errors: ErrorMap,
    pub touched: TouchedSet,
    pub is_submitting: bool,
    pub submit_count: u64,
    /// A debounce timer is pending or a validator is running.
    pub is_validating: bool,
    pub is_valid: bool,
    pub is_dirty: bool,
    pub changed_values: BTreeMap<String, Value>,
    /// Number of top-level keys in the value tree.
    pub field_count: usize,
}

/// Result of validating every registered field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: ErrorMap,
    /// First failing field in registration order, for focus handling.
    pub first_invalid: Option<String>,
}
