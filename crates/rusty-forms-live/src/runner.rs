// File: rusty-forms-live/src/runner.rs
// Purpose: Synchronous validator pass for one field and message resolution

use std::collections::HashMap;
use std::sync::Arc;

use crate::constraint::{ConstraintCheck, Validity};
use crate::field::{ErrorOverrides, FieldDescriptor, FieldValue};
use crate::registry::{FieldContext, ValidatorRegistry, Verdict, NATIVE};
use crate::result::ValidationResult;

/// Field state captured at the start of a run
///
/// Validators only ever see this copy, so a run is unaffected by input that
/// arrives while it is suspended.
#[derive(Debug, Clone)]
pub struct FieldSnapshot {
    pub descriptor: Arc<FieldDescriptor>,
    pub value: FieldValue,
    /// Values of every field in the form, keyed by identifier
    pub form: HashMap<String, FieldValue>,
}

/// Runs the registry against one field
pub struct ValidationRunner {
    registry: ValidatorRegistry,
    constraints: Arc<dyn ConstraintCheck>,
    fallback: String,
}

impl ValidationRunner {
    pub fn new(
        registry: ValidatorRegistry,
        constraints: Arc<dyn ConstraintCheck>,
        fallback: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            constraints,
            fallback: fallback.into(),
        }
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    /// Evaluate every applicable validator in registry order.
    ///
    /// A validator applies when the field enables it (`native` always
    /// applies) and the field has a value or is required.
    pub fn evaluate(&self, snapshot: &FieldSnapshot) -> ValidationResult {
        let field = snapshot.descriptor.as_ref();
        let mut result = ValidationResult::new();

        if !snapshot.value.has_value() && !field.required {
            return result;
        }

        let validity = self.constraints.check(field, &snapshot.value);

        for (name, validator) in self.registry.iter() {
            let argument = match field.validators.get(name) {
                Some(argument) => argument.as_str(),
                None if name == NATIVE => "",
                None => continue,
            };

            let cx = FieldContext::new(field, &snapshot.value, &validity, &snapshot.form, argument);
            let own = match validator.validate(&cx) {
                Verdict::Pass => continue,
                Verdict::Fail => None,
                Verdict::FailWith(message) => Some(message),
            };

            let message = override_message(&field.messages, name, &validity)
                .or(own)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| self.fallback.clone());
            result.push(message);
        }

        result
    }
}

/// Configured message for a failing validator.
///
/// Precedence: validator-specific, then the failed native reason, then the
/// field's generic message.
pub fn override_message(
    overrides: &ErrorOverrides,
    validator: &str,
    validity: &Validity,
) -> Option<String> {
    overrides
        .validators
        .get(validator)
        .or_else(|| {
            validity
                .reason
                .and_then(|reason| overrides.reasons.get(&reason))
        })
        .or(overrides.generic.as_ref())
        .cloned()
}
