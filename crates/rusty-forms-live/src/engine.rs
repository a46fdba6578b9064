// File: rusty-forms-live/src/engine.rs
// Purpose: Form engine - per-field validation pipeline, aggregate queries and submit gate

use futures::future::join_all;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::oneshot;

use crate::config::FormOptions;
use crate::constraint::{ConstraintCheck, Html5Constraints};
use crate::error::{ConfigError, EngineError};
use crate::events::{BroadcastBus, EventBus, FieldEvent, Propagation};
use crate::field::{FieldDescriptor, FieldValue};
use crate::registry::{Validator, ValidatorRegistry};
use crate::remote::{HttpTransport, RemoteChecker, RemoteTransport};
use crate::render::{MemoryRenderer, Renderer};
use crate::result::ValidationResult;
use crate::runner::{FieldSnapshot, ValidationRunner};
use crate::state::{Commit, FieldArena, FieldState, FieldStatus};

/// What caused a field's value to change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTrigger {
    /// Live typing; errors are shown once input pauses
    Input,
    /// Committed change; errors are shown once input pauses
    Change,
    /// Focus left the field; errors are shown immediately
    FocusOut,
}

impl InputTrigger {
    fn defers_display(self) -> bool {
        !matches!(self, InputTrigger::FocusOut)
    }
}

/// Whether a submission may go ahead
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitDecision {
    Proceed,
    Prevented,
}

/// Configures the collaborators of a [`FormEngine`].
///
/// Anything not supplied falls back to the in-crate implementation:
/// [`Html5Constraints`], [`HttpTransport`], [`MemoryRenderer`] and
/// [`BroadcastBus`].
pub struct FormEngineBuilder {
    options: FormOptions,
    custom: Vec<(String, Arc<dyn Validator>)>,
    constraints: Option<Arc<dyn ConstraintCheck>>,
    transport: Option<Arc<dyn RemoteTransport>>,
    renderer: Option<Arc<dyn Renderer>>,
    events: Option<Arc<dyn EventBus>>,
}

impl FormEngineBuilder {
    pub fn new(options: FormOptions) -> Self {
        Self {
            options,
            custom: Vec::new(),
            constraints: None,
            transport: None,
            renderer: None,
            events: None,
        }
    }

    /// Register a named validator.
    ///
    /// Using the name of a built-in (`native`, `match`, `minlength`)
    /// replaces it.
    pub fn validator(mut self, name: impl Into<String>, validator: impl Validator + 'static) -> Self {
        self.custom.push((name.into(), Arc::new(validator)));
        self
    }

    pub fn constraints(mut self, constraints: impl ConstraintCheck + 'static) -> Self {
        self.constraints = Some(Arc::new(constraints));
        self
    }

    pub fn transport(mut self, transport: impl RemoteTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn events(mut self, events: impl EventBus + 'static) -> Self {
        self.events = Some(Arc::new(events));
        self
    }

    /// Check every descriptor and build the engine.
    ///
    /// Fails on the first descriptor that names an unknown validator or
    /// match target, carries a malformed argument or pattern, or reuses an
    /// identifier. Without a custom transport, `remote_base` must parse as a
    /// URL and every remote endpoint must resolve against it.
    pub fn initialize(
        self,
        descriptors: impl IntoIterator<Item = FieldDescriptor>,
    ) -> Result<FormEngine, ConfigError> {
        let mut registry = ValidatorRegistry::with_builtins(&self.options.errors);
        for (name, validator) in self.custom {
            if registry.register_arc(name.clone(), validator).is_some() {
                tracing::warn!("Custom validator '{}' replaces the built-in rule", name);
            }
        }

        // The built-in transport must be able to reach every endpoint
        let http = match self.transport {
            Some(_) => None,
            None => Some(default_transport(self.options.remote_base.as_deref())?),
        };

        let descriptors: Vec<FieldDescriptor> = descriptors.into_iter().collect();
        let mut fields = FieldArena::new();
        for descriptor in &descriptors {
            check_descriptor(&registry, http.as_ref(), descriptor, |id| {
                descriptors.iter().any(|other| other.identifier == id)
            })?;
        }
        for descriptor in descriptors {
            fields.insert(descriptor)?;
        }

        let constraints = self
            .constraints
            .unwrap_or_else(|| Arc::new(Html5Constraints::new()));
        let fallback = self.options.errors.fallback.clone();
        let runner = ValidationRunner::new(registry, constraints, fallback.clone());
        let transport: Arc<dyn RemoteTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(http.clone().unwrap_or_else(HttpTransport::absolute)),
        };

        tracing::info!(
            fields = fields.len(),
            validators = ?runner.registry().names(),
            "form engine initialized"
        );

        let inner = EngineInner {
            remote: RemoteChecker::new(transport, fallback),
            renderer: self
                .renderer
                .unwrap_or_else(|| Arc::new(MemoryRenderer::new())),
            events: self
                .events
                .unwrap_or_else(|| Arc::new(BroadcastBus::default())),
            options: self.options,
            http,
            state: Mutex::new(FormState {
                fields,
                runner: Some(Arc::new(runner)),
            }),
        };
        inner.toggle_gate(&inner.lock().fields);

        Ok(FormEngine {
            inner: Arc::new(inner),
        })
    }
}

fn default_transport(base: Option<&str>) -> Result<HttpTransport, ConfigError> {
    match base {
        Some(base) => reqwest::Url::parse(base)
            .map(HttpTransport::new)
            .map_err(|err| ConfigError::InvalidRemoteBase(err.to_string())),
        None => Ok(HttpTransport::absolute()),
    }
}

fn check_descriptor(
    registry: &ValidatorRegistry,
    http: Option<&HttpTransport>,
    field: &FieldDescriptor,
    known: impl Fn(&str) -> bool,
) -> Result<(), ConfigError> {
    if field.identifier.is_empty() {
        return Err(ConfigError::EmptyIdentifier);
    }

    for (name, argument) in &field.validators {
        let validator = registry
            .resolve(name)
            .ok_or_else(|| ConfigError::UnknownValidator {
                field: field.identifier.clone(),
                validator: name.clone(),
            })?;
        validator
            .check_argument(argument)
            .map_err(|reason| ConfigError::InvalidArgument {
                field: field.identifier.clone(),
                validator: name.clone(),
                reason,
            })?;
    }

    if let Some(target) = field.match_target() {
        if !known(target) {
            return Err(ConfigError::UnknownMatchTarget {
                field: field.identifier.clone(),
                target: target.to_string(),
            });
        }
    }

    if let Some(pattern) = &field.native.pattern {
        Html5Constraints::compile_pattern(pattern).map_err(|err| ConfigError::InvalidPattern {
            field: field.identifier.clone(),
            reason: err.to_string(),
        })?;
    }

    if let (Some(http), Some(endpoint)) = (http, &field.remote) {
        http.resolve(endpoint)
            .map_err(|failure| ConfigError::InvalidEndpoint {
                field: field.identifier.clone(),
                reason: failure.reason,
            })?;
    }

    if let Some(value) = &field.value {
        if value.kind() != field.kind {
            return Err(ConfigError::ValueKind {
                field: field.identifier.clone(),
                expected: field.kind,
            });
        }
    }

    Ok(())
}

struct FormState {
    fields: FieldArena,
    /// `None` once the engine is destroyed
    runner: Option<Arc<ValidationRunner>>,
}

impl FormState {
    fn runner(&self) -> Result<Arc<ValidationRunner>, EngineError> {
        self.runner.clone().ok_or(EngineError::Destroyed)
    }

    fn field(&self, identifier: &str) -> Result<&FieldState, EngineError> {
        self.runner()?;
        self.fields
            .get(identifier)
            .ok_or_else(|| EngineError::UnknownField(identifier.to_string()))
    }

    fn field_mut(&mut self, identifier: &str) -> Result<&mut FieldState, EngineError> {
        self.runner()?;
        self.fields
            .get_mut(identifier)
            .ok_or_else(|| EngineError::UnknownField(identifier.to_string()))
    }
}

struct EngineInner {
    options: FormOptions,
    remote: RemoteChecker,
    /// Built-in transport, when no custom one was supplied
    http: Option<HttpTransport>,
    renderer: Arc<dyn Renderer>,
    events: Arc<dyn EventBus>,
    state: Mutex<FormState>,
}

impl EngineInner {
    fn lock(&self) -> MutexGuard<'_, FormState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Always recomputed from the whole form
    fn toggle_gate(&self, fields: &FieldArena) {
        let disabled = self.options.disable && (fields.has_errors() || fields.is_incomplete());
        self.renderer.set_submit_disabled(disabled);
    }

    /// Push a committed result to the renderer
    fn display(engine: &Arc<Self>, field: &mut FieldState, generation: u64, defer: bool) {
        let identifier = field.descriptor.identifier.clone();
        let delay = engine.options.delay_duration();

        let errors = match &field.last_result {
            Some(result) if result.has_errors() => result.errors().to_vec(),
            _ => {
                field.timer.cancel();
                engine.renderer.clear_errors(
                    &identifier,
                    field.value.has_value(),
                    &engine.options.feedback,
                );
                return;
            }
        };

        if defer && !delay.is_zero() {
            field.status = FieldStatus::Debounced;
            let engine = Arc::downgrade(engine);
            field.timer.schedule(delay, move || {
                show_deferred(engine, &identifier, generation);
            });
        } else {
            engine.renderer.show_errors(
                &identifier,
                &errors,
                engine.options.message_format(),
                &engine.options.feedback,
            );
        }
    }

    fn emit(&self, event: FieldEvent) -> Propagation {
        self.events.emit(&event)
    }

    /// Retire every run, cancel timers and restore the display
    fn reset_fields(&self, state: &mut FormState) {
        let generation = state.fields.next_generation();
        for field in state.fields.iter_mut() {
            field.reset(generation);
            self.renderer
                .restore(&field.descriptor.identifier, &self.options.feedback);
        }
        self.renderer.set_submit_disabled(false);
    }
}

/// Debounce timer callback for errors whose display was deferred
fn show_deferred(engine: Weak<EngineInner>, identifier: &str, generation: u64) {
    let Some(engine) = engine.upgrade() else {
        return;
    };
    let mut state = engine.lock();
    let Some(field) = state.fields.get_mut(identifier) else {
        return;
    };
    if !field.is_current(generation) {
        return;
    }
    if let Some(result) = field.last_result.as_ref().filter(|result| result.has_errors()) {
        engine.renderer.show_errors(
            identifier,
            result.errors(),
            engine.options.message_format(),
            &engine.options.feedback,
        );
        field.status = FieldStatus::Errored;
    }
}

/// Live validation for one form.
///
/// Cloning is cheap and every clone drives the same fields. Renderer calls
/// are made while the engine holds its field state, so a [`Renderer`] must
/// not call back into the engine. Event listeners may.
///
/// # Example
///
/// ```no_run
/// use rusty_forms_live::{FieldDescriptor, FieldValue, FormEngine, FormOptions, InputTrigger};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = FormEngine::initialize(
///     [
///         FieldDescriptor::scalar("password").required().min_length(8),
///         FieldDescriptor::scalar("confirm").matches("password"),
///     ],
///     FormOptions::default(),
/// )?;
///
/// let result = engine
///     .on_input("password", FieldValue::text("short"), InputTrigger::FocusOut)
///     .await?;
/// assert_eq!(result.unwrap().errors(), &["Not long enough"]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FormEngine {
    inner: Arc<EngineInner>,
}

impl FormEngine {
    pub fn builder(options: FormOptions) -> FormEngineBuilder {
        FormEngineBuilder::new(options)
    }

    /// Build an engine with the default collaborators
    pub fn initialize(
        descriptors: impl IntoIterator<Item = FieldDescriptor>,
        options: FormOptions,
    ) -> Result<Self, ConfigError> {
        Self::builder(options).initialize(descriptors)
    }

    pub fn options(&self) -> &FormOptions {
        &self.inner.options
    }

    /// Identifiers in insertion order
    pub fn identifiers(&self) -> Vec<String> {
        self.inner.lock().fields.identifiers()
    }

    /// Store a new value without validating
    pub fn set_value(&self, identifier: &str, value: FieldValue) -> Result<(), EngineError> {
        self.inner.lock().field_mut(identifier)?.set_value(value)
    }

    pub fn value(&self, identifier: &str) -> Result<FieldValue, EngineError> {
        Ok(self.inner.lock().field(identifier)?.value.clone())
    }

    /// Last committed result; `None` until the field has been validated
    pub fn result(&self, identifier: &str) -> Result<Option<ValidationResult>, EngineError> {
        Ok(self.inner.lock().field(identifier)?.last_result.clone())
    }

    pub fn status(&self, identifier: &str) -> Result<FieldStatus, EngineError> {
        Ok(self.inner.lock().field(identifier)?.status)
    }

    /// Any field's last result holds an error.
    ///
    /// A destroyed form has no fields and reports false.
    pub fn has_errors(&self) -> bool {
        self.inner.lock().fields.has_errors()
    }

    /// Any required field is empty, whatever its validators say
    pub fn is_incomplete(&self) -> bool {
        self.inner.lock().fields.is_incomplete()
    }

    /// Disable the submit control while the form has errors or is incomplete
    pub fn toggle_submit_gate(&self) -> Result<(), EngineError> {
        let state = self.inner.lock();
        state.runner()?;
        self.inner.toggle_gate(&state.fields);
        Ok(())
    }

    /// Store `value` and validate the field.
    ///
    /// Live input also revalidates every field that must match this one and
    /// already holds a value.
    pub async fn on_input(
        &self,
        identifier: &str,
        value: FieldValue,
        trigger: InputTrigger,
    ) -> Result<Option<ValidationResult>, EngineError> {
        let dependents = {
            let mut state = self.inner.lock();
            state.field_mut(identifier)?.set_value(value)?;
            if trigger == InputTrigger::Input {
                state.fields.match_dependents(identifier)
            } else {
                Vec::new()
            }
        };

        let own = self.validate_field(identifier, trigger.defers_display());
        let others = join_all(
            dependents
                .iter()
                .filter(|dependent| dependent.as_str() != identifier)
                .map(|dependent| self.validate_field(dependent, true)),
        );
        let (result, others) = futures::join!(own, others);

        for outcome in others {
            if let Err(err) = outcome {
                tracing::debug!("Revalidating a dependent of '{}' failed: {}", identifier, err);
            }
        }
        result
    }

    /// Run every applicable validator on one field and commit the result.
    ///
    /// Returns `Ok(None)` when a listener cancelled the run or a newer run
    /// for the same field superseded it; neither touches the field's state.
    /// With `defer_display` set, errors are shown only once the debounce
    /// delay passes without another run.
    pub async fn validate_field(
        &self,
        identifier: &str,
        defer_display: bool,
    ) -> Result<Option<ValidationResult>, EngineError> {
        self.inner.lock().field(identifier)?;

        let event = FieldEvent::Validate {
            field: identifier.to_string(),
        };
        if self.inner.emit(event) == Propagation::Cancel {
            tracing::debug!("Validation of '{}' cancelled by listener", identifier);
            return Ok(None);
        }

        let (runner, snapshot, generation) = {
            let mut state = self.inner.lock();
            let runner = state.runner()?;
            let generation = state.fields.next_generation();
            let form = state.fields.values();
            let field = state.field_mut(identifier)?;
            field.begin_run(generation);
            field.timer.cancel();
            let snapshot = FieldSnapshot {
                descriptor: field.descriptor.clone(),
                value: field.value.clone(),
                form,
            };
            (runner, snapshot, generation)
        };

        let mut result = runner.evaluate(&snapshot);

        if result.is_valid() && snapshot.value.has_value() && snapshot.descriptor.remote.is_some() {
            let (fire, fired) = oneshot::channel();
            {
                let mut state = self.inner.lock();
                match state.fields.get_mut(identifier) {
                    Some(field) if field.is_current(generation) => {
                        field.timer.schedule(self.inner.options.delay_duration(), move || {
                            let _ = fire.send(());
                        });
                    }
                    _ => return Ok(None),
                }
            }

            // Timer aborted by a newer run, a reset or removal
            if fired.await.is_err() {
                tracing::debug!("Remote check of '{}' superseded before sending", identifier);
                return Ok(None);
            }
            if !self.is_current(identifier, generation) {
                return Ok(None);
            }

            if let Some(message) = self
                .inner
                .remote
                .check(&snapshot.descriptor, &snapshot.value)
                .await
            {
                result.push(message);
            }
        }

        let previous = {
            let mut state = self.inner.lock();
            let Some(field) = state.fields.get_mut(identifier) else {
                return Ok(None);
            };
            let previous = match field.commit(generation, result.clone()) {
                Commit::Stale => {
                    tracing::debug!("Discarding stale result for '{}'", identifier);
                    return Ok(None);
                }
                Commit::Applied { previous } => previous,
            };
            EngineInner::display(&self.inner, field, generation, defer_display);
            self.inner.toggle_gate(&state.fields);
            previous
        };

        if previous.as_ref() != Some(&result) {
            let field = identifier.to_string();
            let event = if result.has_errors() {
                FieldEvent::Invalid {
                    field,
                    errors: result.errors().to_vec(),
                }
            } else {
                FieldEvent::Valid {
                    field,
                    previous: previous.map(ValidationResult::into_errors).unwrap_or_default(),
                }
            };
            self.inner.emit(event);
        }
        self.inner.emit(FieldEvent::Validated {
            field: identifier.to_string(),
        });

        Ok(Some(result))
    }

    fn is_current(&self, identifier: &str, generation: u64) -> bool {
        self.inner
            .lock()
            .fields
            .get(identifier)
            .is_some_and(|field| field.is_current(generation))
    }

    /// Validate every field with immediate display, then gate the submit
    /// control and focus the first field left with errors.
    pub async fn validate_all(&self) -> Result<(), EngineError> {
        let identifiers = {
            let state = self.inner.lock();
            state.runner()?;
            state.fields.identifiers()
        };

        self.validate_each(&identifiers).await?;

        let state = self.inner.lock();
        state.runner()?;
        self.inner.toggle_gate(&state.fields);
        if self.inner.options.focus {
            if let Some(first) = state.fields.first_errored() {
                self.inner.renderer.focus(first);
            }
        }
        Ok(())
    }

    /// Validate the whole form once and decide whether it may be submitted
    pub async fn attempt_submit(&self) -> Result<SubmitDecision, EngineError> {
        self.validate_all().await?;

        let state = self.inner.lock();
        if state.fields.is_incomplete() || state.fields.has_errors() {
            tracing::debug!("Submission prevented");
            Ok(SubmitDecision::Prevented)
        } else {
            Ok(SubmitDecision::Proceed)
        }
    }

    /// Validate fields that arrived with a value, leaving alone those the
    /// server already rendered an error for
    pub async fn validate_prefilled(&self) -> Result<(), EngineError> {
        let identifiers: Vec<String> = {
            let state = self.inner.lock();
            state.runner()?;
            state
                .fields
                .iter()
                .filter(|field| field.value.has_value() && !field.descriptor.server_error)
                .map(|field| field.descriptor.identifier.clone())
                .collect()
        };

        self.validate_each(&identifiers).await
    }

    /// Validate fields concurrently, skipping any removed while the form
    /// was validating
    async fn validate_each(&self, identifiers: &[String]) -> Result<(), EngineError> {
        let runs = identifiers
            .iter()
            .map(|identifier| self.validate_field(identifier, false));
        for outcome in join_all(runs).await {
            match outcome {
                Ok(_) | Err(EngineError::UnknownField(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Forget every result, cancel pending work and restore the display
    pub fn reset(&self) -> Result<(), EngineError> {
        let mut state = self.inner.lock();
        state.runner()?;
        self.inner.reset_fields(&mut state);
        Ok(())
    }

    /// Add a field after initialization
    pub fn add_field(&self, descriptor: FieldDescriptor) -> Result<(), EngineError> {
        let mut state = self.inner.lock();
        let runner = state.runner()?;
        check_descriptor(runner.registry(), self.inner.http.as_ref(), &descriptor, |id| {
            id == descriptor.identifier || state.fields.contains(id)
        })?;
        state.fields.insert(descriptor)?;
        self.inner.toggle_gate(&state.fields);
        Ok(())
    }

    /// Remove a field, cancelling its pending work and clearing its display.
    ///
    /// A field another field must match cannot be removed.
    pub fn remove_field(&self, identifier: &str) -> Result<(), EngineError> {
        let mut state = self.inner.lock();
        state.runner()?;
        if let Some(dependent) = state.fields.dependent_of(identifier) {
            return Err(ConfigError::TargetInUse {
                target: identifier.to_string(),
                dependent: dependent.to_string(),
            }
            .into());
        }

        let removed = state
            .fields
            .remove(identifier)
            .ok_or_else(|| EngineError::UnknownField(identifier.to_string()))?;
        drop(removed);

        self.inner.renderer.restore(identifier, &self.inner.options.feedback);
        self.inner.toggle_gate(&state.fields);
        Ok(())
    }

    /// Reset and release every field. Every clone of this engine reports
    /// [`EngineError::Destroyed`] afterwards.
    pub fn destroy(self) {
        let mut state = self.inner.lock();
        if state.runner.is_none() {
            return;
        }
        self.inner.reset_fields(&mut state);
        state.fields.clear();
        state.runner = None;
        tracing::info!("form engine destroyed");
    }
}

impl std::fmt::Debug for FormEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormEngine")
            .field("fields", &self.identifiers())
            .field("options", &self.inner.options)
            .finish()
    }
}
