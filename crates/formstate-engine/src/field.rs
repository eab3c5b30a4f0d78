//! Per-field metadata and the objects a UI binds to.

use formstate_value::Value;
use serde::{Deserialize, Serialize};

use crate::engine::FormEngine;
use crate::error::Result;
use crate::input::InputKind;

/// Declarative description of a field, separate from its value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMeta {
    /// Visible label. The field name is shown when absent.
    pub label: Option<String>,
    /// Hint shown under the input while it has no visible error.
    pub helper_text: Option<String>,
    /// Widget kind used when the binding forwards a change.
    pub kind: InputKind,
}

impl FieldMeta {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_helper_text(mut self, help: impl Into<String>) -> Self {
        self.helper_text = Some(help.into());
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: InputKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Props for wiring one input to the engine.
///
/// `error_flag` is only raised once the field is touched, so untouched
/// fields do not shout at the user while they are still typing elsewhere.
#[derive(Debug, Clone)]
pub struct FieldBinding {
    pub name: String,
    pub value: Value,
    pub kind: InputKind,
    pub error_flag: bool,
    /// Id of the element describing the error, set while `error_flag` is.
    pub error_described_by: Option<String>,
    engine: FormEngine,
}

impl FieldBinding {
    pub(crate) fn new(
        engine: FormEngine,
        name: String,
        value: Value,
        kind: InputKind,
        error_flag: bool,
    ) -> Self {
        let error_described_by = error_flag.then(|| error_element_id(&name));
        Self {
            name,
            value,
            kind,
            error_flag,
            error_described_by,
            engine,
        }
    }

    /// Forward a raw widget value.
    pub fn on_change(&self, raw: Value) -> Result<()> {
        self.engine.handle_change(&self.name, raw, self.kind)
    }

    /// Forward a focus loss.
    pub async fn on_blur(&self) -> Result<()> {
        self.engine.handle_blur(&self.name).await
    }
}

/// Everything a field component needs to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldState {
    pub name: String,
    pub label: String,
    pub value: Value,
    pub error: Option<String>,
    pub touched: bool,
    pub valid: bool,
    /// The visible error, or the field's help text when there is none.
    pub helper_text: Option<String>,
    pub error_flag: bool,
    pub error_described_by: Option<String>,
}

impl FieldState {
    pub(crate) fn new(
        name: String,
        value: Value,
        error: Option<String>,
        touched: bool,
        meta: Option<&FieldMeta>,
    ) -> Self {
        let error_flag = touched && error.is_some();
        let helper_text = if error_flag {
            error.clone()
        } else {
            meta.and_then(|meta| meta.helper_text.clone())
        };
        Self {
            label: meta
                .and_then(|meta| meta.label.clone())
                .unwrap_or_else(|| name.clone()),
            error_described_by: error_flag.then(|| error_element_id(&name)),
            valid: error.is_none(),
            name,
            value,
            error,
            touched,
            helper_text,
            error_flag,
        }
    }
}

fn error_element_id(name: &str) -> String {
    format!("{name}-error")
}
