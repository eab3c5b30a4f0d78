//! The form state engine.
//!
//! [`FormEngine`] is a cheap, cloneable handle to the state of one form. All
//! state lives behind a single mutex that is only held for short, synchronous
//! sections and never across an `.await`; validators are awaited with the
//! lock released.
//!
//! # Validation requests
//!
//! Every validation request for a field takes a fresh generation number. A
//! result is applied only if its generation is still the latest for that
//! field and the engine has not been torn down, so a slow validator can never
//! overwrite the outcome of a newer one. Debounce timers are per field: a
//! change restarts the timer of that field only.
//!
//! # Snapshots
//!
//! Value trees are never edited in place. Each write produces a new tree, and
//! outside code cannot write into a tree's nodes at all, so a [`Value`]
//! returned by [`FormEngine::values`] or passed to a submit handler is a
//! stable snapshot. A render layer can detect changes with [`Value::ptr_eq`].
//! The error map and touched set are shared the same way behind `Arc`s.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use formstate_value::{
    FieldPath, Value, changed_leaves, deep_clone, deep_equal, delete_nested_field,
    get_nested_value, set_nested_value,
};
use futures_util::future::join_all;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::FormConfig;
use crate::error::{FormError, Result};
use crate::field::{FieldBinding, FieldMeta, FieldState};
use crate::input::{InputKind, normalize};
use crate::status::{FormStatus, ValidationReport};
use crate::submit::{SubmitActions, SubmitFailure, SubmitHandler, SubmitOutcome};
use crate::validator::{ValidatorFn, ValidatorRegistry};

/// Field name to its current error message.
pub type ErrorMap = BTreeMap<String, String>;

/// Names of the fields the user has interacted with.
pub type TouchedSet = BTreeSet<String>;

/// How [`FormEngine::reset_form`] treats the current state.
#[derive(Debug, Clone, Default)]
pub struct ResetOptions {
    /// Replacement snapshot. Also becomes the basis for dirty tracking.
    pub values: Option<Value>,
    pub keep_errors: bool,
    pub keep_touched: bool,
}

impl ResetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_values(mut self, values: Value) -> Self {
        self.values = Some(values);
        self
    }

    #[must_use]
    pub fn keep_errors(mut self) -> Self {
        self.keep_errors = true;
        self
    }

    #[must_use]
    pub fn keep_touched(mut self) -> Self {
        self.keep_touched = true;
        self
    }
}

struct FormState {
    values: Value,
    initial: Value,
    errors: Arc<ErrorMap>,
    touched: Arc<TouchedSet>,
    is_submitting: bool,
    submit_count: u64,
    validators: ValidatorRegistry,
    meta: HashMap<String, FieldMeta>,
    /// Latest request generation per field.
    generations: HashMap<String, u64>,
    next_generation: u64,
    /// Pending debounce timers.
    timers: HashMap<String, JoinHandle<()>>,
    /// Validator runs currently awaiting a result.
    in_flight: usize,
    torn_down: bool,
}

impl FormState {
    /// Start a new validation request for `name`, superseding older ones.
    fn begin_request(&mut self, name: &str) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.generations.insert(name.to_owned(), generation);
        if let Some(timer) = self.timers.remove(name) {
            timer.abort();
        }
        generation
    }

    fn is_current(&self, name: &str, generation: u64) -> bool {
        !self.torn_down && self.generations.get(name) == Some(&generation)
    }

    fn cancel_all(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
        self.generations.clear();
    }

    fn set_error(&mut self, name: &str, message: Option<String>) {
        match message {
            Some(message) => {
                if self.errors.get(name) != Some(&message) {
                    Arc::make_mut(&mut self.errors).insert(name.to_owned(), message);
                }
            }
            None => {
                if self.errors.contains_key(name) {
                    Arc::make_mut(&mut self.errors).remove(name);
                }
            }
        }
    }

    /// `name` has a value, a validator, metadata, an error or a touched flag.
    fn knows(&self, name: &str, value: Option<&Value>) -> bool {
        value.is_some()
            || self.validators.contains(name)
            || self.meta.contains_key(name)
            || self.errors.contains_key(name)
            || self.touched.contains(name)
    }

    fn touch(&mut self, name: &str) {
        if !self.touched.contains(name) {
            Arc::make_mut(&mut self.touched).insert(name.to_owned());
        }
    }
}

struct Shared {
    config: FormConfig,
    state: Mutex<FormState>,
    revision: watch::Sender<u64>,
}

/// State container for one logical form.
#[derive(Clone)]
pub struct FormEngine {
    shared: Arc<Shared>,
}

impl fmt::Debug for FormEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormEngine")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

/// Decrements the in-flight counter when a validator run ends, however it ends.
struct InFlight<'a> {
    engine: &'a FormEngine,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        {
            let mut state = self.engine.state();
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.engine.notify();
    }
}

/// The body of one debounce timer task.
///
/// If the task ends before the delay expires while it is still the field's
/// latest request, the timer entry is released so the engine does not look
/// busy forever. Superseded and aborted timers find a newer generation and
/// leave the state alone.
struct DebounceTimer {
    engine: FormEngine,
    field: String,
    generation: u64,
    expired: bool,
}

impl DebounceTimer {
    async fn expire(&mut self) {
        self.expired = true;
        self.engine.fire(&self.field, self.generation).await;
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        if self.expired {
            return;
        }
        let released = {
            let mut state = self.engine.state();
            state.generations.get(&self.field) == Some(&self.generation)
                && state.timers.remove(&self.field).is_some()
        };
        if released {
            warn!(field = %self.field, "debounce timer stopped before expiry");
            self.engine.notify();
        }
    }
}

/// One field to validate as part of a batch.
struct Request {
    name: String,
    generation: u64,
    validator: ValidatorFn,
    value: Value,
}

impl FormEngine {
    /// Create an engine over a deep copy of `initial`.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::InvalidPath`] if a validator is registered under a
    /// malformed field name.
    pub fn new(initial: Value, validators: ValidatorRegistry, config: FormConfig) -> Result<Self> {
        for name in validators.names() {
            FieldPath::resolve(name, config.allow_nested_fields)?;
        }
        debug!(
            validators = validators.len(),
            nested = config.allow_nested_fields,
            debounce_ms = config.debounce_ms,
            "form engine created"
        );

        let state = FormState {
            values: deep_clone(&initial),
            initial: deep_clone(&initial),
            errors: Arc::default(),
            touched: Arc::default(),
            is_submitting: false,
            submit_count: 0,
            validators,
            meta: HashMap::new(),
            generations: HashMap::new(),
            next_generation: 0,
            timers: HashMap::new(),
            in_flight: 0,
            torn_down: false,
        };
        let (revision, _) = watch::channel(0);
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(state),
                revision,
            }),
        })
    }

    pub fn config(&self) -> &FormConfig {
        &self.shared.config
    }

    fn state(&self) -> MutexGuard<'_, FormState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.shared.revision.send_modify(|revision| *revision += 1);
    }

    fn path(&self, name: &str) -> Result<FieldPath> {
        Ok(FieldPath::resolve(
            name,
            self.shared.config.allow_nested_fields,
        )?)
    }

    /// Receiver of a revision counter bumped on every state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    // ---- input events -------------------------------------------------

    /// Apply a change event from an input.
    ///
    /// The value is normalized for `kind`, stored, and any error on the field
    /// is cleared at once. When change validation is on, a debounced
    /// validation is scheduled; its result replaces the error later.
    ///
    /// # Errors
    ///
    /// Fails on a malformed name, or with [`FormError::NoRuntime`] when a
    /// validation must be scheduled outside a tokio runtime. Nothing is
    /// written in either case.
    pub fn handle_change(&self, name: &str, raw: Value, kind: InputKind) -> Result<()> {
        let value = normalize(raw, kind, self.shared.config.trim_string_values);
        self.write_values(
            vec![(name.to_owned(), value)],
            self.shared.config.validate_on_change,
        )
    }

    /// Apply a focus-loss event: touch, trim, validate.
    pub async fn handle_blur(&self, name: &str) -> Result<()> {
        let path = self.path(name)?;
        let request = {
            let mut state = self.state();
            state.touch(name);
            if self.shared.config.auto_trim_on_blur {
                if let Some(Value::String(text)) = get_nested_value(&state.values, &path) {
                    let trimmed = text.trim();
                    if trimmed.len() != text.len() {
                        state.values =
                            set_nested_value(&state.values, &path, Value::from(trimmed));
                    }
                }
            }
            if self.shared.config.validate_on_blur {
                self.prepare(&mut state, name, &path)
            } else {
                None
            }
        };
        self.notify();

        if let Some((request, all)) = request {
            self.run_request(request, all).await;
        }
        Ok(())
    }

    /// Take a generation and snapshot for validating `name` now.
    fn prepare(
        &self,
        state: &mut FormState,
        name: &str,
        path: &FieldPath,
    ) -> Option<(Request, Value)> {
        let validator = state.validators.get(name)?.clone();
        let generation = state.begin_request(name);
        state.in_flight += 1;
        let all = state.values.clone();
        let value = get_nested_value(&all, path).unwrap_or_default();
        Some((
            Request {
                name: name.to_owned(),
                generation,
                validator,
                value,
            },
            all,
        ))
    }

    /// Await one prepared request and apply it if it is still current.
    ///
    /// The in-flight count taken by [`prepare`](Self::prepare) is released here.
    async fn run_request(&self, request: Request, all: Value) {
        let _in_flight = InFlight { engine: self };
        let message = request
            .validator
            .run(&request.name, request.value, all)
            .await;

        let applied = {
            let mut state = self.state();
            if state.is_current(&request.name, request.generation) {
                state.set_error(&request.name, message);
                true
            } else {
                false
            }
        };
        if applied {
            self.notify();
        } else {
            debug!(field = %request.name, "discarding superseded validation result");
        }
    }

    /// Write values and optionally schedule debounced validation for each.
    fn write_values(&self, entries: Vec<(String, Value)>, validate: bool) -> Result<()> {
        let mut resolved = Vec::with_capacity(entries.len());
        for (name, value) in entries {
            let path = self.path(&name)?;
            resolved.push((name, path, value));
        }

        let runtime = if validate {
            let needs_timer = {
                let state = self.state();
                resolved
                    .iter()
                    .find(|(name, _, _)| state.validators.contains(name))
                    .map(|(name, _, _)| name.clone())
            };
            match needs_timer {
                Some(field) => Some(
                    Handle::try_current().map_err(|_| FormError::NoRuntime { field })?,
                ),
                None => None,
            }
        } else {
            None
        };

        {
            let mut state = self.state();
            for (name, path, value) in resolved {
                state.values = set_nested_value(&state.values, &path, value);
                state.set_error(&name, None);
                if let Some(runtime) = &runtime {
                    if !state.torn_down && state.validators.contains(&name) {
                        self.schedule(&mut state, &name, runtime);
                    }
                }
            }
        }
        self.notify();
        Ok(())
    }

    /// Replace the debounce timer of `name` with a fresh one.
    fn schedule(&self, state: &mut FormState, name: &str, runtime: &Handle) {
        let generation = state.begin_request(name);
        let delay = self.shared.config.debounce();
        let engine = self.clone();
        let field = name.to_owned();
        // Built on first poll: a task dropped unpolled must not touch the lock held here.
        let timer = runtime.spawn(async move {
            let mut pending = DebounceTimer {
                engine,
                field,
                generation,
                expired: false,
            };
            tokio::time::sleep(delay).await;
            pending.expire().await;
        });
        state.timers.insert(name.to_owned(), timer);
        debug!(field = name, generation, delay_ms = self.shared.config.debounce_ms, "validation scheduled");
    }

    /// Debounce expiry: validate the value the field holds now.
    async fn fire(&self, name: &str, generation: u64) {
        let prepared = {
            let mut state = self.state();
            if !state.is_current(name, generation) {
                return;
            }
            state.timers.remove(name);
            match (state.validators.get(name).cloned(), self.path(name)) {
                (Some(validator), Ok(path)) => {
                    state.in_flight += 1;
                    let all = state.values.clone();
                    let value = get_nested_value(&all, &path).unwrap_or_default();
                    Some((
                        Request {
                            name: name.to_owned(),
                            generation,
                            validator,
                            value,
                        },
                        all,
                    ))
                }
                _ => None,
            }
        };
        if let Some((request, all)) = prepared {
            self.run_request(request, all).await;
        }
    }

    // ---- validation ---------------------------------------------------

    /// Run the validator registered for `name` against `value`.
    ///
    /// Returns `None` when the value is valid or no validator is registered.
    /// The error map is not touched.
    pub async fn validate_field(&self, name: &str, value: Value, all: Value) -> Option<String> {
        let validator = self.state().validators.get(name).cloned();
        match validator {
            Some(validator) => validator.run(name, value, all).await,
            None => None,
        }
    }

    /// Validate every registered field against `snapshot` and replace the
    /// error map with the result.
    ///
    /// Pending debounce timers are canceled. A field whose validation was
    /// superseded while this batch ran keeps its newer entry.
    pub async fn validate_all(&self, snapshot: &Value) -> ValidationReport {
        let requests: Vec<Request> = {
            let mut state = self.state();
            let registered: Vec<(String, ValidatorFn)> = state
                .validators
                .iter()
                .map(|(name, validator)| (name.to_owned(), validator.clone()))
                .collect();
            state.in_flight += 1;
            registered
                .into_iter()
                .map(|(name, validator)| {
                    let value = self
                        .path(&name)
                        .ok()
                        .and_then(|path| get_nested_value(snapshot, &path))
                        .unwrap_or_default();
                    Request {
                        generation: state.begin_request(&name),
                        name,
                        validator,
                        value,
                    }
                })
                .collect()
        };
        self.notify();
        let _in_flight = InFlight { engine: self };

        let messages = join_all(requests.iter().map(|request| {
            request
                .validator
                .run(&request.name, request.value.clone(), snapshot.clone())
        }))
        .await;

        let mut errors = ErrorMap::new();
        let mut first_invalid = None;
        {
            let mut state = self.state();
            for (request, message) in requests.iter().zip(messages) {
                let message = if state.is_current(&request.name, request.generation) {
                    message
                } else {
                    state.errors.get(&request.name).cloned()
                };
                if let Some(message) = message {
                    first_invalid.get_or_insert_with(|| request.name.clone());
                    errors.insert(request.name.clone(), message);
                }
            }
            if !state.torn_down {
                state.errors = Arc::new(errors.clone());
            }
        }
        self.notify();
        debug!(invalid = errors.len(), "validated all fields");

        ValidationReport {
            is_valid: errors.is_empty(),
            errors,
            first_invalid,
        }
    }

    /// [`validate_all`](Self::validate_all) against the current values.
    pub async fn validate_form(&self) -> ValidationReport {
        let snapshot = self.values();
        self.validate_all(&snapshot).await
    }

    // ---- submit -------------------------------------------------------

    /// Run one submit attempt.
    ///
    /// Every top-level key and every validated field is marked touched. When
    /// submit validation is on and a field is invalid, `on_submit` is not
    /// called. Field errors returned by `on_submit` are merged into the error
    /// map.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::Submit`] when `on_submit` fails with something
    /// other than field errors. The submitting flag is cleared first.
    pub async fn submit<F, Fut>(&self, on_submit: F) -> Result<SubmitOutcome>
    where
        F: FnOnce(Value, SubmitActions) -> Fut,
        Fut: Future<Output = std::result::Result<(), SubmitFailure>>,
    {
        let (snapshot, attempt) = {
            let mut state = self.state();
            state.is_submitting = true;
            state.submit_count += 1;
            let mut names = state.values.keys();
            names.extend(state.validators.names().map(str::to_owned));
            for name in names {
                state.touch(&name);
            }
            (state.values.clone(), state.submit_count)
        };
        self.notify();
        info!(attempt, "submitting form");

        if self.shared.config.validate_on_submit {
            let report = self.validate_all(&snapshot).await;
            if !report.is_valid {
                self.finish_submit();
                info!(attempt, invalid = report.errors.len(), "submit blocked by validation");
                return Ok(SubmitOutcome::Invalid {
                    errors: report.errors,
                    first_invalid: report.first_invalid,
                });
            }
        }

        let result = on_submit(snapshot, SubmitActions::new(self.clone())).await;
        self.finish_submit();
        match result {
            Ok(()) => {
                info!(attempt, "form submitted");
                Ok(SubmitOutcome::Submitted)
            }
            Err(SubmitFailure::FieldErrors(errors)) => {
                info!(attempt, rejected = errors.len(), "submit rejected with field errors");
                self.set_errors(errors.clone());
                Ok(SubmitOutcome::Rejected { errors })
            }
            Err(SubmitFailure::Other(error)) => {
                warn!(attempt, error = %error, "submit handler failed");
                Err(FormError::Submit(error))
            }
        }
    }

    /// Bind `on_submit` into a handler that can be called once per attempt.
    pub fn handle_submit<F, Fut>(&self, on_submit: F) -> SubmitHandler<F>
    where
        F: Fn(Value, SubmitActions) -> Fut,
        Fut: Future<Output = std::result::Result<(), SubmitFailure>>,
    {
        SubmitHandler::new(self.clone(), on_submit)
    }

    fn finish_submit(&self) {
        self.state().is_submitting = false;
        self.notify();
    }

    // ---- programmatic updates -----------------------------------------

    /// Restore the initial snapshot, or install a new one.
    ///
    /// Pending validations are canceled. The submit count is kept.
    pub fn reset_form(&self, options: ResetOptions) {
        {
            let mut state = self.state();
            if let Some(values) = &options.values {
                state.initial = deep_clone(values);
            }
            state.values = deep_clone(&state.initial);
            if !options.keep_errors {
                state.errors = Arc::default();
            }
            if !options.keep_touched {
                state.touched = Arc::default();
            }
            state.is_submitting = false;
            state.cancel_all();
        }
        debug!(replaced = options.values.is_some(), "form reset");
        self.notify();
    }

    /// Store `value` at `name` without input normalization.
    pub fn set_field_value(&self, name: &str, value: Value, validate: bool) -> Result<()> {
        self.write_values(vec![(name.to_owned(), value)], validate)
    }

    /// Store several values at once. Nothing is written if any name is invalid.
    pub fn set_values<I, S>(&self, values: I, validate: bool) -> Result<()>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let entries = values
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();
        self.write_values(entries, validate)
    }

    /// Merge `errors` into the error map. Empty messages clear their field.
    pub fn set_errors(&self, errors: ErrorMap) {
        {
            let mut state = self.state();
            for (name, message) in errors {
                state.set_error(&name, Some(message).filter(|m| !m.is_empty()));
            }
        }
        self.notify();
    }

    pub fn set_field_error(&self, name: &str, message: Option<String>) {
        self.state()
            .set_error(name, message.filter(|m| !m.is_empty()));
        self.notify();
    }

    pub fn clear_errors(&self) {
        self.state().errors = Arc::default();
        self.notify();
    }

    pub fn set_field_touched(&self, name: &str, touched: bool) {
        {
            let mut state = self.state();
            if touched {
                state.touch(name);
            } else if state.touched.contains(name) {
                Arc::make_mut(&mut state.touched).remove(name);
            }
        }
        self.notify();
    }

    /// Attach label, help text and widget kind to a field.
    pub fn set_field_meta(&self, name: &str, meta: FieldMeta) {
        self.state().meta.insert(name.to_owned(), meta);
        self.notify();
    }

    /// Register a field at runtime.
    ///
    /// The value is written to both the live tree and the initial snapshot,
    /// so adding a field does not make the form dirty.
    pub fn add_field(
        &self,
        name: &str,
        initial: Value,
        validator: Option<ValidatorFn>,
    ) -> Result<()> {
        let path = self.path(name)?;
        {
            let mut state = self.state();
            state.values = set_nested_value(&state.values, &path, initial.clone());
            state.initial = set_nested_value(&state.initial, &path, initial);
            if let Some(validator) = validator {
                state.validators.insert(name, validator);
            }
        }
        debug!(field = name, "field added");
        self.notify();
        Ok(())
    }

    /// Deregister a field: value, validator, error, touched flag and metadata.
    pub fn remove_field(&self, name: &str) -> Result<()> {
        let path = self.path(name)?;
        {
            let mut state = self.state();
            state.values = delete_nested_field(&state.values, &path);
            state.initial = delete_nested_field(&state.initial, &path);
            state.validators.remove(name);
            state.meta.remove(name);
            state.set_error(name, None);
            if state.touched.contains(name) {
                Arc::make_mut(&mut state.touched).remove(name);
            }
            state.generations.remove(name);
            if let Some(timer) = state.timers.remove(name) {
                timer.abort();
            }
        }
        debug!(field = name, "field removed");
        self.notify();
        Ok(())
    }

    /// Stop all pending work. Results arriving afterwards are dropped.
    pub fn teardown(&self) {
        {
            let mut state = self.state();
            state.torn_down = true;
            state.cancel_all();
        }
        debug!("form engine torn down");
        self.notify();
    }

    pub fn is_torn_down(&self) -> bool {
        self.state().torn_down
    }

    // ---- reads --------------------------------------------------------

    /// Current value tree.
    ///
    /// The tree is read-only. To change it, build an edited copy with
    /// [`set_nested_value`] and hand the leaves back through
    /// [`set_values`](Self::set_values).
    pub fn values(&self) -> Value {
        self.state().values.clone()
    }

    /// Snapshot used for dirty tracking.
    pub fn initial_values(&self) -> Value {
        self.state().initial.clone()
    }

    /// Value at `name`, if present.
    pub fn value(&self, name: &str) -> Result<Option<Value>> {
        let path = self.path(name)?;
        Ok(get_nested_value(&self.state().values, &path))
    }

    pub fn errors(&self) -> Arc<ErrorMap> {
        Arc::clone(&self.state().errors)
    }

    pub fn error(&self, name: &str) -> Option<String> {
        self.state().errors.get(name).cloned()
    }

    pub fn touched(&self) -> Arc<TouchedSet> {
        Arc::clone(&self.state().touched)
    }

    pub fn is_touched(&self, name: &str) -> bool {
        self.state().touched.contains(name)
    }

    pub fn is_submitting(&self) -> bool {
        self.state().is_submitting
    }

    pub fn submit_count(&self) -> u64 {
        self.state().submit_count
    }

    /// A debounce timer is pending or a validator is running.
    pub fn is_validating(&self) -> bool {
        let state = self.state();
        !state.timers.is_empty() || state.in_flight > 0
    }

    /// Registered validator names in registration order.
    pub fn validated_fields(&self) -> Vec<String> {
        self.state()
            .validators
            .names()
            .map(str::to_owned)
            .collect()
    }

    /// The values differ structurally from the initial snapshot.
    pub fn has_changes(&self) -> bool {
        let state = self.state();
        !deep_equal(&state.values, &state.initial)
    }

    /// Every leaf that differs from the initial snapshot, with its current value.
    pub fn changed_values(&self) -> BTreeMap<String, Value> {
        let state = self.state();
        changed_leaves(
            &state.initial,
            &state.values,
            self.shared.config.allow_nested_fields,
        )
    }

    /// Form-level snapshot.
    pub fn status(&self) -> FormStatus {
        let state = self.state();
        let nested = self.shared.config.allow_nested_fields;
        FormStatus {
            values: state.values.clone(),
            errors: (*state.errors).clone(),
            touched: (*state.touched).clone(),
            is_submitting: state.is_submitting,
            submit_count: state.submit_count,
            is_validating: !state.timers.is_empty() || state.in_flight > 0,
            is_valid: state.errors.is_empty(),
            is_dirty: !deep_equal(&state.values, &state.initial),
            changed_values: changed_leaves(&state.initial, &state.values, nested),
            field_count: state.values.keys().len(),
        }
    }

    /// Binding props for the input showing `name`.
    ///
    /// # Errors
    ///
    /// Fails on a malformed name, or with [`FormError::UnknownField`] when
    /// the engine holds nothing at all for `name`.
    pub fn field(&self, name: &str) -> Result<FieldBinding> {
        let path = self.path(name)?;
        let (value, kind, error_flag) = {
            let state = self.state();
            let value = get_nested_value(&state.values, &path);
            if !state.knows(name, value.as_ref()) {
                return Err(FormError::UnknownField {
                    name: name.to_owned(),
                });
            }
            let value = value.unwrap_or_default();
            let kind = state.meta.get(name).map(|meta| meta.kind).unwrap_or_default();
            let error_flag = state.touched.contains(name) && state.errors.contains_key(name);
            (value, kind, error_flag)
        };
        Ok(FieldBinding::new(
            self.clone(),
            name.to_owned(),
            value,
            kind,
            error_flag,
        ))
    }

    /// Render state for the field `name`.
    ///
    /// A field known only by its error (a server error on a field the form
    /// never defined, for instance) is reported with a null value.
    ///
    /// # Errors
    ///
    /// Same as [`field`](Self::field).
    pub fn field_state(&self, name: &str) -> Result<FieldState> {
        let path = self.path(name)?;
        let state = self.state();
        let value = get_nested_value(&state.values, &path);
        if !state.knows(name, value.as_ref()) {
            return Err(FormError::UnknownField {
                name: name.to_owned(),
            });
        }
        Ok(FieldState::new(
            name.to_owned(),
            value.unwrap_or_default(),
            state.errors.get(name).cloned(),
            state.touched.contains(name),
            state.meta.get(name),
        ))
    }
}
