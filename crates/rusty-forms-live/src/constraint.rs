// File: rusty-forms-live/src/constraint.rs
// Purpose: Native constraint checks (the browser's validity state, headless)

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::field::{FieldDescriptor, FieldValue, InputType};

// Same shapes the server-side validators accept
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://[^\s/$.?#].[^\s]*$").unwrap()
});

const STEP_TOLERANCE: f64 = 1e-9;

/// Which native constraint failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidityReason {
    Type,
    Pattern,
    Step,
    Max,
    Min,
    Required,
}

impl std::fmt::Display for ValidityReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValidityReason::Type => "type",
            ValidityReason::Pattern => "pattern",
            ValidityReason::Step => "step",
            ValidityReason::Max => "max",
            ValidityReason::Min => "min",
            ValidityReason::Required => "required",
        };
        f.write_str(name)
    }
}

/// Outcome of a native constraint check
#[derive(Debug, Clone, PartialEq)]
pub struct Validity {
    pub valid: bool,
    /// `None` when valid
    pub reason: Option<ValidityReason>,
    /// Default message for the failure (empty when valid)
    pub message: String,
}

impl Validity {
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
            message: String::new(),
        }
    }

    pub fn invalid(reason: ValidityReason, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            message: message.into(),
        }
    }
}

/// The constraint-check capability of a control
///
/// Drives the `native` validator and the reason-specific error overrides.
pub trait ConstraintCheck: Send + Sync {
    fn check(&self, field: &FieldDescriptor, value: &FieldValue) -> Validity;
}

impl<F> ConstraintCheck for F
where
    F: Fn(&FieldDescriptor, &FieldValue) -> Validity + Send + Sync,
{
    fn check(&self, field: &FieldDescriptor, value: &FieldValue) -> Validity {
        self(field, value)
    }
}

/// HTML5 constraint validation for `required`, `type`, `pattern`, `min`,
/// `max` and `step`.
///
/// When several constraints fail the reported reason follows the order
/// type, pattern, step, max, min, required.
#[derive(Debug, Default)]
pub struct Html5Constraints {
    patterns: Mutex<HashMap<String, Regex>>,
}

impl Html5Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a `pattern` attribute the way browsers apply it (whole value)
    pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
        Regex::new(&format!("^(?:{})$", pattern))
    }

    fn pattern_matches(&self, pattern: &str, value: &str) -> bool {
        let mut cache = self.patterns.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(regex) = cache.get(pattern) {
            return regex.is_match(value);
        }
        match Self::compile_pattern(pattern) {
            Ok(regex) => {
                let matched = regex.is_match(value);
                cache.insert(pattern.to_string(), regex);
                matched
            }
            // Rejected at setup; a pattern that fails to compile never constrains
            Err(_) => true,
        }
    }

    fn check_text(&self, field: &FieldDescriptor, text: &str) -> Validity {
        let native = &field.native;

        let type_ok = match native.input_type {
            InputType::Text => true,
            InputType::Email => EMAIL_REGEX.is_match(text),
            InputType::Url => URL_REGEX.is_match(text),
            InputType::Number => parse_number(text).is_some(),
        };
        if !type_ok {
            let message = match native.input_type {
                InputType::Email => "Please enter an email address.",
                InputType::Url => "Please enter a URL.",
                _ => "Please enter a number.",
            };
            return Validity::invalid(ValidityReason::Type, message);
        }

        if let Some(pattern) = &native.pattern {
            if !self.pattern_matches(pattern, text) {
                return Validity::invalid(
                    ValidityReason::Pattern,
                    "Please match the requested format.",
                );
            }
        }

        let Some(number) = parse_number(text) else {
            return Validity::valid();
        };

        if let Some(step) = native.step.filter(|step| *step > 0.0) {
            let base = native.min.unwrap_or(0.0);
            let steps = (number - base) / step;
            if (steps - steps.round()).abs() > STEP_TOLERANCE {
                return Validity::invalid(ValidityReason::Step, "Please enter a valid value.");
            }
        }

        if let Some(max) = native.max {
            if number > max {
                return Validity::invalid(
                    ValidityReason::Max,
                    format!("Value must be less than or equal to {}.", max),
                );
            }
        }

        if let Some(min) = native.min {
            if number < min {
                return Validity::invalid(
                    ValidityReason::Min,
                    format!("Value must be greater than or equal to {}.", min),
                );
            }
        }

        Validity::valid()
    }
}

/// Finite numeric value of `text`; "NaN" and "inf" are not numbers to a form
fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

impl ConstraintCheck for Html5Constraints {
    fn check(&self, field: &FieldDescriptor, value: &FieldValue) -> Validity {
        if !value.has_value() {
            return if field.required {
                let message = match value {
                    FieldValue::Checked(_) => "Please check this box if you want to proceed.",
                    FieldValue::Choice(_) | FieldValue::Selected(_) => {
                        "Please select one of these options."
                    }
                    FieldValue::Text(_) => "Please fill out this field.",
                };
                Validity::invalid(ValidityReason::Required, message)
            } else {
                Validity::valid()
            };
        }

        match value {
            FieldValue::Text(text) => self.check_text(field, text),
            _ => Validity::valid(),
        }
    }
}
