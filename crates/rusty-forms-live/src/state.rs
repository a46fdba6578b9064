// File: rusty-forms-live/src/state.rs
// Purpose: Per-field records owned by the engine, keyed by identifier

use std::collections::HashMap;
use std::sync::Arc;

use crate::debounce::DebounceScheduler;
use crate::error::{ConfigError, EngineError};
use crate::field::{FieldDescriptor, FieldValue};
use crate::result::ValidationResult;

/// Where a field is in its validation cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldStatus {
    /// Never validated, or reset
    #[default]
    Idle,
    /// A run is evaluating or waiting on a remote check
    Validating,
    /// Result committed, display waiting on the debounce timer
    Debounced,
    Clean,
    Errored,
}

/// Outcome of trying to commit a run
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Commit {
    /// A newer run owns the field
    Stale,
    Applied { previous: Option<ValidationResult> },
}

pub(crate) struct FieldState {
    pub(crate) descriptor: Arc<FieldDescriptor>,
    pub(crate) value: FieldValue,
    pub(crate) last_result: Option<ValidationResult>,
    generation: u64,
    pub(crate) status: FieldStatus,
    pub(crate) timer: DebounceScheduler,
}

impl FieldState {
    fn new(descriptor: FieldDescriptor, generation: u64) -> Self {
        let value = descriptor
            .value
            .clone()
            .unwrap_or_else(|| FieldValue::empty(descriptor.kind));
        Self {
            descriptor: Arc::new(descriptor),
            value,
            last_result: None,
            generation,
            status: FieldStatus::Idle,
            timer: DebounceScheduler::new(),
        }
    }

    pub(crate) fn identifier(&self) -> &str {
        &self.descriptor.identifier
    }

    /// Take ownership of the field for run `generation`
    pub(crate) fn begin_run(&mut self, generation: u64) {
        self.generation = generation;
        self.status = FieldStatus::Validating;
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub(crate) fn commit(&mut self, generation: u64, result: ValidationResult) -> Commit {
        if !self.is_current(generation) {
            return Commit::Stale;
        }
        self.status = if result.has_errors() {
            FieldStatus::Errored
        } else {
            FieldStatus::Clean
        };
        let previous = self.last_result.replace(result);
        Commit::Applied { previous }
    }

    /// Forget the result and retire any run in flight
    pub(crate) fn reset(&mut self, generation: u64) {
        self.generation = generation;
        self.timer.cancel();
        self.last_result = None;
        self.status = FieldStatus::Idle;
    }

    pub(crate) fn set_value(&mut self, value: FieldValue) -> Result<(), EngineError> {
        if value.kind() != self.descriptor.kind {
            return Err(EngineError::ValueKind {
                field: self.descriptor.identifier.clone(),
                expected: self.descriptor.kind,
            });
        }
        self.value = value;
        Ok(())
    }

    pub(crate) fn has_errors(&self) -> bool {
        self.last_result
            .as_ref()
            .is_some_and(ValidationResult::has_errors)
    }

    pub(crate) fn is_incomplete(&self) -> bool {
        self.descriptor.required && self.value.is_blank()
    }
}

/// Field records in insertion order with an identifier index
#[derive(Default)]
pub(crate) struct FieldArena {
    fields: Vec<FieldState>,
    index: HashMap<String, usize>,
    next_generation: u64,
}

impl FieldArena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Hand out a generation no field has used yet
    pub(crate) fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    pub(crate) fn insert(&mut self, descriptor: FieldDescriptor) -> Result<(), ConfigError> {
        if self.index.contains_key(&descriptor.identifier) {
            return Err(ConfigError::DuplicateField(descriptor.identifier));
        }
        let generation = self.next_generation();
        self.index
            .insert(descriptor.identifier.clone(), self.fields.len());
        self.fields.push(FieldState::new(descriptor, generation));
        Ok(())
    }

    pub(crate) fn get(&self, identifier: &str) -> Option<&FieldState> {
        self.index.get(identifier).map(|&i| &self.fields[i])
    }

    pub(crate) fn get_mut(&mut self, identifier: &str) -> Option<&mut FieldState> {
        match self.index.get(identifier) {
            Some(&i) => self.fields.get_mut(i),
            None => None,
        }
    }

    pub(crate) fn contains(&self, identifier: &str) -> bool {
        self.index.contains_key(identifier)
    }

    pub(crate) fn remove(&mut self, identifier: &str) -> Option<FieldState> {
        let position = self.index.remove(identifier)?;
        let removed = self.fields.remove(position);
        self.index = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| (field.identifier().to_string(), i))
            .collect();
        Some(removed)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &FieldState> {
        self.fields.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut FieldState> {
        self.fields.iter_mut()
    }

    pub(crate) fn identifiers(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|field| field.identifier().to_string())
            .collect()
    }

    /// Current value of every field
    pub(crate) fn values(&self) -> HashMap<String, FieldValue> {
        self.fields
            .iter()
            .map(|field| (field.identifier().to_string(), field.value.clone()))
            .collect()
    }

    pub(crate) fn has_errors(&self) -> bool {
        self.fields.iter().any(FieldState::has_errors)
    }

    pub(crate) fn is_incomplete(&self) -> bool {
        self.fields.iter().any(FieldState::is_incomplete)
    }

    pub(crate) fn first_errored(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.has_errors())
            .map(FieldState::identifier)
    }

    /// Fields that must match `target` and already hold a value
    pub(crate) fn match_dependents(&self, target: &str) -> Vec<String> {
        self.fields
            .iter()
            .filter(|field| field.descriptor.match_target() == Some(target))
            .filter(|field| field.value.has_value())
            .map(|field| field.identifier().to_string())
            .collect()
    }

    /// First field, other than `target` itself, whose match target is `target`
    pub(crate) fn dependent_of(&self, target: &str) -> Option<&str> {
        self.fields
            .iter()
            .filter(|field| field.identifier() != target)
            .find(|field| field.descriptor.match_target() == Some(target))
            .map(FieldState::identifier)
    }

    pub(crate) fn len(&self) -> usize {
        self.fields.len()
    }

    pub(crate) fn clear(&mut self) {
        self.fields.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ValueKind;

    fn arena(fields: Vec<FieldDescriptor>) -> FieldArena {
        let mut arena = FieldArena::new();
        for field in fields {
            arena.insert(field).unwrap();
        }
        arena
    }

    #[test]
    fn test_stale_commit_is_rejected() {
        let mut arena = arena(vec![FieldDescriptor::scalar("email")]);
        let older = arena.next_generation();
        let newer = arena.next_generation();

        let field = arena.get_mut("email").unwrap();
        field.begin_run(older);
        field.begin_run(newer);

        let taken: ValidationResult = ["taken"].into_iter().collect();
        assert_eq!(field.commit(older, taken), Commit::Stale);
        assert_eq!(field.last_result, None);
        assert_eq!(field.status, FieldStatus::Validating);

        assert_eq!(
            field.commit(newer, ValidationResult::new()),
            Commit::Applied { previous: None }
        );
        assert_eq!(field.status, FieldStatus::Clean);
    }

    #[test]
    fn test_reset_retires_run_in_flight() {
        let mut arena = arena(vec![FieldDescriptor::scalar("name")]);
        let run = arena.next_generation();
        let reset = arena.next_generation();

        let field = arena.get_mut("name").unwrap();
        field.begin_run(run);
        field.reset(reset);
        assert_eq!(
            field.commit(run, ["Required"].into_iter().collect()),
            Commit::Stale
        );
        assert_eq!(field.status, FieldStatus::Idle);
    }

    #[test]
    fn test_duplicate_identifier() {
        let mut arena = arena(vec![FieldDescriptor::scalar("email")]);
        assert_eq!(
            arena.insert(FieldDescriptor::checkbox("email")),
            Err(ConfigError::DuplicateField("email".to_string()))
        );
    }

    #[test]
    fn test_incomplete_trims_whitespace() {
        let mut arena = arena(vec![
            FieldDescriptor::scalar("name").required(),
            FieldDescriptor::scalar("nick"),
        ]);
        assert!(arena.is_incomplete());

        arena
            .get_mut("name")
            .unwrap()
            .set_value(FieldValue::text("   "))
            .unwrap();
        assert!(arena.is_incomplete());

        arena
            .get_mut("name")
            .unwrap()
            .set_value(FieldValue::text("Ada"))
            .unwrap();
        assert!(!arena.is_incomplete());
    }

    #[test]
    fn test_set_value_checks_kind() {
        let mut arena = arena(vec![FieldDescriptor::checkbox("terms")]);
        let err = arena
            .get_mut("terms")
            .unwrap()
            .set_value(FieldValue::text("yes"))
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::ValueKind {
                field: "terms".to_string(),
                expected: ValueKind::Checkbox,
            }
        );
    }

    #[test]
    fn test_remove_keeps_order_and_index() {
        let mut arena = arena(vec![
            FieldDescriptor::scalar("a"),
            FieldDescriptor::scalar("b"),
            FieldDescriptor::scalar("c"),
        ]);
        assert!(arena.remove("a").is_some());
        assert_eq!(arena.identifiers(), vec!["b", "c"]);
        assert_eq!(arena.get("c").unwrap().identifier(), "c");
        assert!(arena.remove("a").is_none());
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_match_dependents_need_a_value() {
        let mut arena = arena(vec![
            FieldDescriptor::scalar("password"),
            FieldDescriptor::scalar("confirm").matches("password"),
        ]);
        assert!(arena.match_dependents("password").is_empty());
        assert_eq!(arena.dependent_of("password"), Some("confirm"));

        arena
            .get_mut("confirm")
            .unwrap()
            .set_value(FieldValue::text("x"))
            .unwrap();
        assert_eq!(arena.match_dependents("password"), vec!["confirm"]);
    }
}
