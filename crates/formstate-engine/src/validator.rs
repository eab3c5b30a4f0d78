//! Validator functions and the per-form registry.
//!
//! A validator receives the field value and the whole value tree and returns
//! an error message, or `None` when the value is valid. Validators are tagged
//! sync or async so the engine knows whether a call can suspend.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use anyhow::anyhow;
use formstate_value::Value;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tracing::warn;

/// What a validator produces: a message, nothing, or a failure.
pub type ValidationResult = anyhow::Result<Option<String>>;

type SyncValidator = dyn Fn(&Value, &Value) -> ValidationResult + Send + Sync;
type AsyncValidator = dyn Fn(Value, Value) -> BoxFuture<'static, ValidationResult> + Send + Sync;

/// Message used when a validator fails without saying why.
const UNKNOWN_FAILURE: &str = "validation failed";

/// A field validator.
#[derive(Clone)]
pub enum ValidatorFn {
    /// Runs to completion on the calling task.
    Sync(Arc<SyncValidator>),
    /// Returns a future, e.g. for a uniqueness check against a backend.
    Async(Arc<AsyncValidator>),
}

impl ValidatorFn {
    /// Wrap an infallible synchronous check.
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&Value, &Value) -> Option<String> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(
            move |value: &Value, all: &Value| -> ValidationResult { Ok(check(value, all)) },
        ))
    }

    /// Wrap a synchronous check that may fail.
    pub fn fallible<F>(check: F) -> Self
    where
        F: Fn(&Value, &Value) -> ValidationResult + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(check))
    }

    /// Wrap an asynchronous check.
    pub fn from_async<F, Fut>(check: F) -> Self
    where
        F: Fn(Value, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ValidationResult> + Send + 'static,
    {
        Self::Async(Arc::new(move |value: Value, all: Value| check(value, all).boxed()))
    }

    #[inline]
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }

    /// Run the validator and reduce the outcome to a message.
    ///
    /// Fails closed: an error, a panic or a panicking future all become an
    /// error message. An empty message counts as valid.
    pub async fn run(&self, field: &str, value: Value, all: Value) -> Option<String> {
        let outcome = match self {
            Self::Sync(check) => catch_unwind(AssertUnwindSafe(|| check(&value, &all)))
                .unwrap_or_else(|panic| Err(panic_error(&*panic))),
            Self::Async(check) => match catch_unwind(AssertUnwindSafe(|| check(value, all))) {
                Ok(future) => AssertUnwindSafe(future)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(panic_error(&*panic))),
                Err(panic) => Err(panic_error(&*panic)),
            },
        };

        match outcome {
            Ok(Some(message)) if !message.is_empty() => Some(message),
            Ok(_) => None,
            Err(error) => {
                warn!(field, error = %error, "validator failed, marking field invalid");
                let message = error.to_string();
                Some(if message.is_empty() {
                    UNKNOWN_FAILURE.to_string()
                } else {
                    message
                })
            }
        }
    }
}

impl fmt::Debug for ValidatorFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("ValidatorFn::Sync"),
            Self::Async(_) => f.write_str("ValidatorFn::Async"),
        }
    }
}

fn panic_error(panic: &(dyn Any + Send)) -> anyhow::Error {
    if let Some(message) = panic.downcast_ref::<&str>() {
        anyhow!("{message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        anyhow!("{message}")
    } else {
        anyhow!(UNKNOWN_FAILURE)
    }
}

/// Validators keyed by field name, in registration order.
///
/// Order matters: it decides which invalid field is reported first.
#[derive(Debug, Clone, Default)]
pub struct ValidatorRegistry {
    entries: Vec<(String, ValidatorFn)>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator, replacing any existing one for `name` in place.
    pub fn insert(&mut self, name: impl Into<String>, validator: ValidatorFn) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = validator,
            None => self.entries.push((name, validator)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, validator: ValidatorFn) -> Self {
        self.insert(name, validator);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<ValidatorFn> {
        let index = self.entries.iter().position(|(existing, _)| existing == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, name: &str) -> Option<&ValidatorFn> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, validator)| validator)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered field names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValidatorFn)> {
        self.entries.iter().map(|(name, validator)| (name.as_str(), validator))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, ValidatorFn)> for ValidatorRegistry {
    fn from_iter<I: IntoIterator<Item = (S, ValidatorFn)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (name, validator) in iter {
            registry.insert(name, validator);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn test_sync_validator_message() {
        let validator = ValidatorFn::new(|value, _| {
            value.as_str().filter(|s| s.is_empty()).map(|_| "empty".to_string())
        });
        assert_eq!(
            block_on(validator.run("sku", Value::from(""), Value::Null)),
            Some("empty".to_string())
        );
        assert_eq!(block_on(validator.run("sku", Value::from("A-1"), Value::Null)), None);
    }

    #[test]
    fn test_empty_message_is_valid() {
        let validator = ValidatorFn::new(|_, _| Some(String::new()));
        assert_eq!(block_on(validator.run("sku", Value::Null, Value::Null)), None);
    }

    #[test]
    fn test_sync_panic_fails_closed() {
        let validator = ValidatorFn::new(|_, _| panic!("lookup table missing"));
        assert_eq!(
            block_on(validator.run("sku", Value::Null, Value::Null)),
            Some("lookup table missing".to_string())
        );
    }

    #[test]
    fn test_async_error_fails_closed() {
        let validator =
            ValidatorFn::from_async(|_, _| async { Err(anyhow!("backend unreachable")) });
        assert!(validator.is_async());
        assert_eq!(
            block_on(validator.run("sku", Value::Null, Value::Null)),
            Some("backend unreachable".to_string())
        );
    }

    #[test]
    fn test_registry_keeps_order_on_replace() {
        let mut registry: ValidatorRegistry = [
            ("name", ValidatorFn::new(|_, _| None)),
            ("email", ValidatorFn::new(|_, _| None)),
        ]
        .into_iter()
        .collect();
        registry.insert("name", ValidatorFn::new(|_, _| Some("x".into())));

        assert_eq!(registry.names().collect::<Vec<_>>(), ["name", "email"]);
        assert!(registry.remove("email").is_some());
        assert!(!registry.contains("email"));
        assert_eq!(registry.len(), 1);
    }
}
