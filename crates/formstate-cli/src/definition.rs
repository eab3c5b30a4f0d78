//! Form definitions loaded from JSON.
//!
//! ```json
//! {
//!   "config": { "debounce_ms": 300 },
//!   "initial": { "contact": { "email": "" } },
//!   "fields": [
//!     { "name": "contact.email", "label": "Correo", "kind": "email",
//!       "rules": [{ "rule": "required" }, { "rule": "email" }] }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use formstate_engine::{
    FieldMeta, FormConfig, FormEngine, InputKind, Messages, RuleSpec, Rules, ValidatorRegistry,
};
use formstate_value::Value;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::debug;

/// One field of a form definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub kind: InputKind,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl FieldDefinition {
    fn meta(&self) -> FieldMeta {
        FieldMeta {
            label: self.label.clone(),
            helper_text: self.help.clone(),
            kind: self.kind,
        }
    }
}

/// A whole form: configuration, initial values, fields and messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormDefinition {
    #[serde(default)]
    pub config: FormConfig,
    #[serde(default = "empty_object")]
    pub initial: JsonValue,
    /// Fields in validation order.
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub messages: Messages,
}

fn empty_object() -> JsonValue {
    JsonValue::Object(serde_json::Map::new())
}

impl FormDefinition {
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("read form definition {}", path.display()))?;
        Self::from_json_str(&source)
            .with_context(|| format!("parse form definition {}", path.display()))
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        let definition: Self = serde_json::from_str(source)?;
        if !definition.initial.is_object() {
            bail!("initial values must be a JSON object");
        }
        if let Some(name) = definition.duplicate_field() {
            bail!("field '{name}' is defined more than once");
        }
        Ok(definition)
    }

    fn duplicate_field(&self) -> Option<&str> {
        self.fields.iter().enumerate().find_map(|(index, field)| {
            self.fields[..index]
                .iter()
                .any(|earlier| earlier.name == field.name)
                .then_some(field.name.as_str())
        })
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Widget kind of `name`, `text` for fields without a definition.
    pub fn kind_of(&self, name: &str) -> InputKind {
        self.field(name).map(|field| field.kind).unwrap_or_default()
    }

    pub fn rule_count(&self) -> usize {
        self.fields.iter().map(|field| field.rules.len()).sum()
    }

    /// Compile every rule and create the engine.
    ///
    /// # Errors
    ///
    /// Fails on an invalid field name or an invalid `pattern` rule.
    pub fn build_engine(&self) -> Result<FormEngine> {
        let rules = Rules::new(self.messages.clone());
        let nested = self.config.allow_nested_fields;
        let mut validators = ValidatorRegistry::new();
        for field in &self.fields {
            let validator = rules
                .build(&field.rules, nested)
                .with_context(|| format!("rules of field '{}'", field.name))?;
            if let Some(validator) = validator {
                validators.insert(field.name.as_str(), validator);
            }
        }
        debug!(
            fields = self.fields.len(),
            validators = validators.len(),
            "form definition compiled"
        );

        let engine = FormEngine::new(
            Value::from(&self.initial),
            validators,
            self.config.clone(),
        )?;
        for field in &self.fields {
            engine.set_field_meta(&field.name, field.meta());
        }
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNUP: &str = r#"{
        "config": { "debounce_ms": 50 },
        "initial": { "user": { "email": "", "password": "", "confirm": "" } },
        "fields": [
            { "name": "user.email", "label": "Correo", "kind": "email",
              "rules": [{ "rule": "required" }, { "rule": "email" }] },
            { "name": "user.password", "kind": "password",
              "rules": [{ "rule": "min_length", "min": 8 }] },
            { "name": "user.confirm",
              "rules": [{ "rule": "matches_field", "field": "user.password" }] }
        ]
    }"#;

    #[test]
    fn test_parse_signup_definition() {
        let definition = FormDefinition::from_json_str(SIGNUP).unwrap();
        assert_eq!(definition.config.debounce_ms, 50);
        assert!(definition.config.validate_on_blur);
        assert_eq!(definition.fields.len(), 3);
        assert_eq!(definition.rule_count(), 4);
        assert_eq!(definition.kind_of("user.password"), InputKind::Password);
        assert_eq!(definition.kind_of("user.unknown"), InputKind::Text);
    }

    #[test]
    fn test_build_engine_registers_validators_and_meta() {
        let definition = FormDefinition::from_json_str(SIGNUP).unwrap();
        let engine = definition.build_engine().unwrap();
        let state = engine.field_state("user.email").unwrap();
        assert_eq!(state.label, "Correo");
        assert_eq!(engine.values(), Value::from(&definition.initial));
    }

    #[test]
    fn test_rejects_non_object_initial() {
        let error = FormDefinition::from_json_str(r#"{ "initial": [1, 2] }"#).unwrap_err();
        assert!(error.to_string().contains("JSON object"));
    }

    #[test]
    fn test_rejects_duplicate_fields() {
        let error = FormDefinition::from_json_str(
            r#"{ "fields": [{ "name": "a" }, { "name": "b" }, { "name": "a" }] }"#,
        )
        .unwrap_err();
        assert_eq!(error.to_string(), "field 'a' is defined more than once");
    }

    #[test]
    fn test_invalid_pattern_names_the_field() {
        let definition = FormDefinition::from_json_str(
            r#"{ "fields": [{ "name": "sku", "rules": [{ "rule": "pattern", "pattern": "(" }] }] }"#,
        )
        .unwrap();
        let error = definition.build_engine().unwrap_err();
        assert_eq!(error.to_string(), "rules of field 'sku'");
    }

    #[test]
    fn test_unknown_rule_is_a_parse_error() {
        let result = FormDefinition::from_json_str(
            r#"{ "fields": [{ "name": "a", "rules": [{ "rule": "shout" }] }] }"#,
        );
        assert!(result.is_err());
    }
}
