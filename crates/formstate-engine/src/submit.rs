//! Submit lifecycle types.
//!
//! A submit handler receives the validated values and a [`SubmitActions`]
//! handle. It resolves to `Ok(())`, to field errors reported by the server,
//! or to any other failure, which the engine hands back to the caller.

use std::future::Future;

use anyhow::anyhow;
use formstate_value::Value;
use serde_json::Value as JsonValue;

use crate::engine::{ErrorMap, FormEngine, ResetOptions};
use crate::error::Result;

/// Conventional locations of a field-error payload in a rejected response.
const ERROR_POINTERS: &[&str] = &["/response/data/errors", "/data/errors", "/errors"];

/// An event whose default action can be suppressed, e.g. a native form submit.
pub trait SubmitEvent {
    fn prevent_default(&mut self);
}

/// Operations a submit handler may perform on the form it came from.
#[derive(Debug, Clone)]
pub struct SubmitActions {
    engine: FormEngine,
}

impl SubmitActions {
    pub(crate) fn new(engine: FormEngine) -> Self {
        Self { engine }
    }

    pub fn reset_form(&self, options: ResetOptions) {
        self.engine.reset_form(options);
    }

    /// Merge errors into the error map.
    pub fn set_errors(&self, errors: ErrorMap) {
        self.engine.set_errors(errors);
    }
}

/// Why a submit handler did not succeed.
#[derive(Debug)]
pub enum SubmitFailure {
    /// The server rejected specific fields.
    FieldErrors(ErrorMap),
    /// Anything that cannot be shown next to a field.
    Other(anyhow::Error),
}

impl SubmitFailure {
    /// Classify a rejected response body.
    ///
    /// Field errors are looked up at `response.data.errors`, `data.errors` and
    /// `errors`, in that order. A field may map to a message or to a list of
    /// messages, in which case the first one is kept.
    pub fn from_response(response: &JsonValue) -> Self {
        ERROR_POINTERS
            .iter()
            .filter_map(|pointer| response.pointer(pointer))
            .find_map(field_errors)
            .map_or_else(
                || Self::Other(anyhow!("submission rejected without field errors")),
                Self::FieldErrors,
            )
    }
}

impl From<anyhow::Error> for SubmitFailure {
    fn from(error: anyhow::Error) -> Self {
        Self::Other(error)
    }
}

fn field_errors(payload: &JsonValue) -> Option<ErrorMap> {
    let entries = payload.as_object()?;
    let errors: ErrorMap = entries
        .iter()
        .filter_map(|(field, messages)| {
            let message = match messages {
                JsonValue::String(message) => Some(message.clone()),
                JsonValue::Array(list) => list.iter().find_map(|m| m.as_str().map(str::to_owned)),
                _ => None,
            }?;
            (!message.is_empty()).then(|| (field.clone(), message))
        })
        .collect();
    (!errors.is_empty()).then_some(errors)
}

/// What happened to one submit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The handler ran and succeeded.
    Submitted,
    /// Validation failed; the handler was not called.
    Invalid {
        errors: ErrorMap,
        /// The field the host should focus.
        first_invalid: Option<String>,
    },
    /// The handler reported field errors, now merged into the error map.
    Rejected { errors: ErrorMap },
}

impl SubmitOutcome {
    #[inline]
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted)
    }
}

/// A reusable submit callback bound to one engine.
pub struct SubmitHandler<F> {
    engine: FormEngine,
    on_submit: F,
}

impl<F, Fut> SubmitHandler<F>
where
    F: Fn(Value, SubmitActions) -> Fut,
    Fut: Future<Output = std::result::Result<(), SubmitFailure>>,
{
    pub(crate) fn new(engine: FormEngine, on_submit: F) -> Self {
        Self { engine, on_submit }
    }

    /// Run one submit attempt, suppressing the event's default action first.
    pub async fn call(&self, event: Option<&mut dyn SubmitEvent>) -> Result<SubmitOutcome> {
        if let Some(event) = event {
            event.prevent_default();
        }
        self.engine
            .submit(|values, actions| (self.on_submit)(values, actions))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_errors_under_response_data() {
        let failure = SubmitFailure::from_response(&json!({
            "response": {"status": 422, "data": {"errors": {"sku": ["El código ya existe", "x"]}}}
        }));
        let SubmitFailure::FieldErrors(errors) = failure else {
            panic!("expected field errors");
        };
        assert_eq!(errors["sku"], "El código ya existe");
    }

    #[test]
    fn test_errors_at_top_level() {
        let failure = SubmitFailure::from_response(&json!({"errors": {"email": "taken"}}));
        assert!(matches!(failure, SubmitFailure::FieldErrors(ref e) if e["email"] == "taken"));
    }

    #[test]
    fn test_unrecognized_payload() {
        let failure = SubmitFailure::from_response(&json!({"message": "Internal Server Error"}));
        assert!(matches!(failure, SubmitFailure::Other(_)));

        let empty = SubmitFailure::from_response(&json!({"data": {"errors": {}}}));
        assert!(matches!(empty, SubmitFailure::Other(_)));
    }
}
