//! Form state engine.
//!
//! One [`FormEngine`] owns the values, errors, touched flags and submit state
//! of one form. Inputs feed it change and blur events; it validates fields
//! with caller-supplied [`ValidatorFn`]s (debounced on change) and exposes
//! binding props per field and a status snapshot for the whole form.
//!
//! The engine never touches a DOM or any other UI toolkit. When a submit is
//! blocked, [`SubmitOutcome::Invalid`] names the first invalid field and the
//! host decides how to focus it.
//!
//! # Example
//!
//! ```
//! use formstate_engine::{FormConfig, FormEngine, Rules, SubmitOutcome, ValidatorRegistry};
//! use formstate_value::Value;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let rules = Rules::default();
//! let validators = ValidatorRegistry::new().with("contact.email", rules.required());
//! let initial = Value::from(serde_json::json!({"contact": {"email": ""}}));
//! let form = FormEngine::new(initial, validators, FormConfig::default()).unwrap();
//!
//! form.handle_blur("contact.email").await.unwrap();
//! assert_eq!(form.error("contact.email").as_deref(), Some("Este campo es requerido"));
//!
//! let outcome = form.submit(|_, _| async { Ok(()) }).await.unwrap();
//! assert!(matches!(outcome, SubmitOutcome::Invalid { .. }));
//! # });
//! ```

mod config;
mod engine;
mod error;
mod field;
mod input;
mod rules;
mod status;
mod submit;
mod validator;

// Re-export error types
pub use error::{FormError, Result};

// Re-export configuration
pub use config::FormConfig;

// Re-export the engine and its state types
pub use engine::{ErrorMap, FormEngine, ResetOptions, TouchedSet};
pub use field::{FieldBinding, FieldMeta, FieldState};
pub use input::{InputKind, normalize};
pub use status::{FormStatus, ValidationReport};
pub use submit::{SubmitActions, SubmitEvent, SubmitFailure, SubmitHandler, SubmitOutcome};

// Re-export validators and rules
pub use rules::{Messages, RuleSpec, Rules};
pub use validator::{ValidationResult, ValidatorFn, ValidatorRegistry};
