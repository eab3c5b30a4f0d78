//! Built-in validation rules.
//!
//! [`Rules`] builds [`ValidatorFn`]s from a [`Messages`] catalogue. One
//! instance is constructed by the application and passed to whatever builds
//! forms, so the catalogue can be localized without global state.
//!
//! Every rule except [`Rules::required`] accepts a missing value, so optional
//! fields only need the rules that apply once something is entered.

use std::sync::{Arc, LazyLock};

use formstate_value::{FieldPath, Pattern, Value, deep_equal, get_nested_value};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{FormError, Result};
use crate::validator::{ValidationResult, ValidatorFn};

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex")
});

/// Rule messages. `{min}` and `{max}` are replaced by the rule's bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub required: String,
    pub email: String,
    pub min_length: String,
    pub max_length: String,
    pub pattern: String,
    pub min: String,
    pub max: String,
    pub numeric: String,
    pub integer: String,
    pub matches: String,
    pub one_of: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            required: "Este campo es requerido".to_string(),
            email: "Ingrese un correo electrónico válido".to_string(),
            min_length: "Debe tener al menos {min} caracteres".to_string(),
            max_length: "No debe exceder {max} caracteres".to_string(),
            pattern: "El formato no es válido".to_string(),
            min: "El valor mínimo es {min}".to_string(),
            max: "El valor máximo es {max}".to_string(),
            numeric: "Debe ser un número válido".to_string(),
            integer: "Debe ser un número entero".to_string(),
            matches: "Los campos no coinciden".to_string(),
            one_of: "Seleccione una opción válida".to_string(),
        }
    }
}

/// Validator factory bound to one message catalogue.
#[derive(Debug, Clone, Default)]
pub struct Rules {
    messages: Arc<Messages>,
}

impl Rules {
    pub fn new(messages: Messages) -> Self {
        Self {
            messages: Arc::new(messages),
        }
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Fails on null, blank strings, empty arrays and unchecked boxes.
    pub fn required(&self) -> ValidatorFn {
        let message = self.messages.required.clone();
        ValidatorFn::new(move |value, _| is_missing(value).then(|| message.clone()))
    }

    pub fn email(&self) -> ValidatorFn {
        let message = self.messages.email.clone();
        ValidatorFn::new(move |value, _| {
            let text = present_text(value)?;
            (!EMAIL_REGEX.is_match(text.trim())).then(|| message.clone())
        })
    }

    /// Minimum number of characters (or array entries).
    pub fn min_length(&self, min: usize) -> ValidatorFn {
        let message = self.messages.min_length.replace("{min}", &min.to_string());
        ValidatorFn::new(move |value, _| {
            let length = length_of(value)?;
            (length < min).then(|| message.clone())
        })
    }

    /// Maximum number of characters (or array entries).
    pub fn max_length(&self, max: usize) -> ValidatorFn {
        let message = self.messages.max_length.replace("{max}", &max.to_string());
        ValidatorFn::new(move |value, _| {
            let length = length_of(value)?;
            (length > max).then(|| message.clone())
        })
    }

    /// Text must match `pattern` (e.g. a product-code format).
    pub fn pattern(&self, pattern: Pattern, message: Option<String>) -> ValidatorFn {
        let message = message.unwrap_or_else(|| self.messages.pattern.clone());
        ValidatorFn::new(move |value, _| {
            let text = present_text(value)?;
            (!pattern.is_match(text)).then(|| message.clone())
        })
    }

    pub fn min(&self, min: f64) -> ValidatorFn {
        let message = self.messages.min.replace("{min}", &min.to_string());
        let numeric = self.messages.numeric.clone();
        ValidatorFn::new(move |value, _| {
            if is_missing(value) {
                return None;
            }
            match number_of(value) {
                Some(n) => (n < min).then(|| message.clone()),
                None => Some(numeric.clone()),
            }
        })
    }

    pub fn max(&self, max: f64) -> ValidatorFn {
        let message = self.messages.max.replace("{max}", &max.to_string());
        let numeric = self.messages.numeric.clone();
        ValidatorFn::new(move |value, _| {
            if is_missing(value) {
                return None;
            }
            match number_of(value) {
                Some(n) => (n > max).then(|| message.clone()),
                None => Some(numeric.clone()),
            }
        })
    }

    pub fn numeric(&self) -> ValidatorFn {
        let message = self.messages.numeric.clone();
        ValidatorFn::new(move |value, _| {
            if is_missing(value) {
                return None;
            }
            number_of(value).is_none().then(|| message.clone())
        })
    }

    pub fn integer(&self) -> ValidatorFn {
        let message = self.messages.integer.clone();
        ValidatorFn::new(move |value, _| {
            if is_missing(value) {
                return None;
            }
            match number_of(value) {
                Some(n) if n.fract() == 0.0 => None,
                _ => Some(message.clone()),
            }
        })
    }

    /// The value must equal the value at `other`, e.g. a password confirmation.
    pub fn matches_field(&self, other: FieldPath) -> ValidatorFn {
        let message = self.messages.matches.clone();
        ValidatorFn::new(move |value, all| {
            let expected = get_nested_value(all, &other).unwrap_or_default();
            (!deep_equal(value, &expected)).then(|| message.clone())
        })
    }

    /// The value must be one of `options`.
    pub fn one_of(&self, options: Vec<Value>) -> ValidatorFn {
        let message = self.messages.one_of.clone();
        ValidatorFn::new(move |value, _| {
            if is_missing(value) {
                return None;
            }
            (!options.iter().any(|option| deep_equal(option, value))).then(|| message.clone())
        })
    }

    /// Run `validators` in order and report the first failure.
    ///
    /// The result is synchronous when every part is.
    pub fn all(&self, validators: Vec<ValidatorFn>) -> ValidatorFn {
        if validators.iter().all(|validator| !validator.is_async()) {
            let checks: Vec<_> = validators
                .into_iter()
                .filter_map(|validator| match validator {
                    ValidatorFn::Sync(check) => Some(check),
                    ValidatorFn::Async(_) => None,
                })
                .collect();
            return ValidatorFn::fallible(move |value, all| -> ValidationResult {
                for check in &checks {
                    if let Some(message) = check(value, all)?.filter(|m| !m.is_empty()) {
                        return Ok(Some(message));
                    }
                }
                Ok(None)
            });
        }

        let validators = Arc::new(validators);
        ValidatorFn::from_async(move |value, all| {
            let validators = Arc::clone(&validators);
            async move {
                for validator in validators.iter() {
                    if let Some(message) = validator.run("", value.clone(), all.clone()).await {
                        return Ok(Some(message));
                    }
                }
                Ok(None)
            }
        })
    }

    /// Build one validator from declarative rules. `None` for an empty list.
    pub fn build(&self, specs: &[RuleSpec], nested: bool) -> Result<Option<ValidatorFn>> {
        let mut validators = specs
            .iter()
            .map(|spec| spec.build(self, nested))
            .collect::<Result<Vec<_>>>()?;
        Ok(match validators.len() {
            0 => None,
            1 => validators.pop(),
            _ => Some(self.all(validators)),
        })
    }
}

/// A rule named in a form definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleSpec {
    Required,
    Email,
    MinLength {
        min: usize,
    },
    MaxLength {
        max: usize,
    },
    Pattern {
        pattern: String,
        #[serde(default)]
        message: Option<String>,
    },
    Min {
        min: f64,
    },
    Max {
        max: f64,
    },
    Numeric,
    Integer,
    MatchesField {
        field: String,
    },
    OneOf {
        options: Vec<JsonValue>,
    },
}

impl RuleSpec {
    /// Turn the rule into a validator.
    pub fn build(&self, rules: &Rules, nested: bool) -> Result<ValidatorFn> {
        let validator = match self {
            Self::Required => rules.required(),
            Self::Email => rules.email(),
            Self::MinLength { min } => rules.min_length(*min),
            Self::MaxLength { max } => rules.max_length(*max),
            Self::Pattern { pattern, message } => {
                let compiled =
                    Pattern::new(pattern).map_err(|source| FormError::InvalidPattern {
                        pattern: pattern.clone(),
                        source,
                    })?;
                rules.pattern(compiled, message.clone())
            }
            Self::Min { min } => rules.min(*min),
            Self::Max { max } => rules.max(*max),
            Self::Numeric => rules.numeric(),
            Self::Integer => rules.integer(),
            Self::MatchesField { field } => {
                rules.matches_field(FieldPath::resolve(field, nested)?)
            }
            Self::OneOf { options } => rules.one_of(options.iter().map(Value::from).collect()),
        };
        Ok(validator)
    }
}

fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::List(node) => node.read().is_empty(),
        Value::Bool(checked) => !checked,
        _ => false,
    }
}

/// Text of a non-blank string value.
fn present_text(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.trim().is_empty())
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.chars().count()),
        Value::List(node) => Some(node.read().len()),
        _ => None,
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n).filter(|n| n.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}
