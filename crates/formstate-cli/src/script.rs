//! Scripted form sessions.
//!
//! A script is a JSON array of steps replayed in order against one engine:
//!
//! ```json
//! [
//!   { "step": "change", "field": "contact.email", "value": " ana@example" },
//!   { "step": "blur", "field": "contact.email" },
//!   { "step": "wait", "ms": 300 },
//!   { "step": "submit", "reject": { "errors": { "contact.email": "Ya registrado" } } }
//! ]
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use formstate_engine::{FormEngine, FormError, InputKind, ResetOptions, SubmitFailure, SubmitOutcome};
use formstate_value::Value;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{Instrument, debug, info, info_span, trace};

use crate::definition::FormDefinition;
use crate::logging::redact_value;

/// Upper bound for pending validations to land once the script is done.
const SETTLE_LIMIT: Duration = Duration::from_secs(30);

/// One user or host action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    /// An input change event. `kind` overrides the field's definition.
    Change {
        field: String,
        value: JsonValue,
        #[serde(default)]
        kind: Option<InputKind>,
    },
    Blur {
        field: String,
    },
    /// A programmatic write, validated only when asked.
    Set {
        field: String,
        value: JsonValue,
        #[serde(default)]
        validate: bool,
    },
    Wait {
        ms: u64,
    },
    Validate,
    /// A submit attempt. With `reject`, the handler fails with that response.
    Submit {
        #[serde(default)]
        reject: Option<JsonValue>,
    },
    /// Restore the initial values, or install `values` as the new ones.
    Reset {
        #[serde(default)]
        values: Option<JsonValue>,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Change { field, .. } => write!(f, "change {field}"),
            Self::Blur { field } => write!(f, "blur {field}"),
            Self::Set { field, .. } => write!(f, "set {field}"),
            Self::Wait { ms } => write!(f, "wait {ms}ms"),
            Self::Validate => f.write_str("validate"),
            Self::Submit { reject: None } => f.write_str("submit"),
            Self::Submit { reject: Some(_) } => f.write_str("submit (rejected)"),
            Self::Reset { values: None } => f.write_str("reset"),
            Self::Reset { values: Some(_) } => f.write_str("reset (new values)"),
        }
    }
}

/// The steps of one session.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Script {
    pub steps: Vec<Step>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("read script {}", path.display()))?;
        Self::from_json_str(&source).with_context(|| format!("parse script {}", path.display()))
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }
}

/// What one step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: String,
    pub detail: String,
}

/// Replay `script` against `engine`, then wait for pending validations.
///
/// Must run inside a tokio runtime with the time driver enabled.
///
/// # Errors
///
/// Fails on an invalid field name, or when a submit handler fails for a
/// reason other than field errors.
pub async fn replay(
    engine: &FormEngine,
    definition: &FormDefinition,
    script: &Script,
) -> Result<Vec<StepReport>> {
    let mut reports = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.iter().enumerate() {
        let detail = run_step(engine, definition, step)
            .instrument(info_span!("step", index, step = %step))
            .await
            .with_context(|| format!("step {} ({step})", index + 1))?;
        reports.push(StepReport {
            step: step.to_string(),
            detail,
        });
    }
    settle(engine).await?;
    info!(steps = reports.len(), "script replayed");
    Ok(reports)
}

async fn run_step(engine: &FormEngine, definition: &FormDefinition, step: &Step) -> Result<String> {
    let detail = match step {
        Step::Change { field, value, kind } => {
            let raw = value.to_string();
            trace!(field = %field, value = redact_value(&raw), "change");
            let kind = kind.unwrap_or_else(|| definition.kind_of(field));
            engine.handle_change(field, Value::from(value), kind)?;
            String::new()
        }
        Step::Blur { field } => {
            engine.handle_blur(field).await?;
            engine.error(field).unwrap_or_default()
        }
        Step::Set {
            field,
            value,
            validate,
        } => {
            engine.set_field_value(field, Value::from(value), *validate)?;
            String::new()
        }
        Step::Wait { ms } => {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
            validity(engine.errors().len())
        }
        Step::Validate => {
            let report = engine.validate_form().await;
            validity(report.errors.len())
        }
        Step::Submit { reject } => {
            let reject = reject.clone();
            let outcome = engine
                .submit(move |_values, _actions| async move {
                    match reject {
                        Some(response) => Err(SubmitFailure::from_response(&response)),
                        None => Ok(()),
                    }
                })
                .await;
            match outcome {
                Ok(outcome) => describe_outcome(&outcome),
                Err(FormError::Submit(error)) => format!("failed: {error}"),
                Err(error) => return Err(error.into()),
            }
        }
        Step::Reset { values } => {
            let mut options = ResetOptions::new();
            if let Some(values) = values {
                options = options.with_values(Value::from(values));
            }
            engine.reset_form(options);
            String::new()
        }
    };
    Ok(detail)
}

fn validity(errors: usize) -> String {
    match errors {
        0 => "valid".to_owned(),
        1 => "1 error".to_owned(),
        n => format!("{n} errors"),
    }
}

/// One-line summary of a submit attempt.
pub fn describe_outcome(outcome: &SubmitOutcome) -> String {
    match outcome {
        SubmitOutcome::Submitted => "submitted".to_owned(),
        SubmitOutcome::Invalid {
            first_invalid: Some(field),
            ..
        } => format!("blocked, focus {field}"),
        SubmitOutcome::Invalid { errors, .. } => format!("blocked, {}", validity(errors.len())),
        SubmitOutcome::Rejected { errors } => {
            format!("rejected by server, {}", validity(errors.len()))
        }
    }
}

/// Wait until no debounce timer is pending and no validator is running.
async fn settle(engine: &FormEngine) -> Result<()> {
    let mut revisions = engine.subscribe();
    let wait = async {
        while engine.is_validating() {
            if revisions.changed().await.is_err() {
                break;
            }
        }
    };
    if tokio::time::timeout(SETTLE_LIMIT, wait).await.is_err() {
        bail!(
            "validations still pending after {}s",
            SETTLE_LIMIT.as_secs()
        );
    }
    debug!("pending validations settled");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_step() {
        let script = Script::from_json_str(
            r#"[
                { "step": "change", "field": "age", "value": "42", "kind": "number" },
                { "step": "blur", "field": "age" },
                { "step": "set", "field": "name", "value": "Ana" },
                { "step": "wait", "ms": 300 },
                { "step": "validate" },
                { "step": "submit" },
                { "step": "reset", "values": { "age": 1 } }
            ]"#,
        )
        .unwrap();
        assert_eq!(script.steps.len(), 7);
        assert_eq!(
            script.steps[0],
            Step::Change {
                field: "age".to_owned(),
                value: JsonValue::from("42"),
                kind: Some(InputKind::Number),
            }
        );
        assert_eq!(
            script.steps[2],
            Step::Set {
                field: "name".to_owned(),
                value: JsonValue::from("Ana"),
                validate: false,
            }
        );
    }

    #[test]
    fn test_step_labels() {
        let labels: Vec<String> = [
            Step::Wait { ms: 5 },
            Step::Submit {
                reject: Some(JsonValue::Null),
            },
            Step::Reset { values: None },
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(labels, ["wait 5ms", "submit (rejected)", "reset"]);
    }

    #[test]
    fn test_unknown_step_is_rejected() {
        assert!(Script::from_json_str(r#"[{ "step": "hover", "field": "a" }]"#).is_err());
    }

    #[test]
    fn test_describe_outcome() {
        let blocked = SubmitOutcome::Invalid {
            errors: [("email".to_owned(), "x".to_owned())].into(),
            first_invalid: Some("email".to_owned()),
        };
        assert_eq!(describe_outcome(&blocked), "blocked, focus email");
        let rejected = SubmitOutcome::Rejected {
            errors: [("a".to_owned(), "x".to_owned()), ("b".to_owned(), "y".to_owned())].into(),
        };
        assert_eq!(describe_outcome(&rejected), "rejected by server, 2 errors");
    }
}
