// File: rusty-forms-live/src/registry.rs
// Purpose: Named validator registry with the built-in native/match/minlength rules

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ErrorTemplates;
use crate::constraint::Validity;
use crate::field::{FieldDescriptor, FieldValue};

/// Built-in validator backed by the native constraint check
pub const NATIVE: &str = "native";
/// Built-in validator comparing against another field
pub const MATCH: &str = "match";
/// Built-in validator enforcing a minimum text length
pub const MINLENGTH: &str = "minlength";

/// What a validator reports for a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// Failed without a message of its own
    Fail,
    /// Failed with a default message
    FailWith(String),
}

impl Verdict {
    /// `true` means "has an error", mirroring boolean-returning rules
    pub fn from_error(failed: bool) -> Self {
        if failed {
            Verdict::Fail
        } else {
            Verdict::Pass
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

impl From<Option<String>> for Verdict {
    fn from(error: Option<String>) -> Self {
        error.map_or(Verdict::Pass, Verdict::FailWith)
    }
}

/// Read-only view of the field being validated and the rest of the form
pub struct FieldContext<'a> {
    field: &'a FieldDescriptor,
    value: &'a FieldValue,
    validity: &'a Validity,
    form: &'a HashMap<String, FieldValue>,
    argument: &'a str,
}

impl<'a> FieldContext<'a> {
    pub fn new(
        field: &'a FieldDescriptor,
        value: &'a FieldValue,
        validity: &'a Validity,
        form: &'a HashMap<String, FieldValue>,
        argument: &'a str,
    ) -> Self {
        Self {
            field,
            value,
            validity,
            form,
            argument,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.field.identifier
    }

    pub fn descriptor(&self) -> &FieldDescriptor {
        self.field
    }

    pub fn value(&self) -> &FieldValue {
        self.value
    }

    /// Argument the field enabled this validator with
    pub fn argument(&self) -> &str {
        self.argument
    }

    /// Result of the native constraint check for this run
    pub fn validity(&self) -> &Validity {
        self.validity
    }

    /// Current value of another field in the form
    pub fn field_value(&self, identifier: &str) -> Option<&FieldValue> {
        self.form.get(identifier)
    }
}

/// A named validation rule
pub trait Validator: Send + Sync {
    fn validate(&self, cx: &FieldContext<'_>) -> Verdict;

    /// Reject a malformed argument when the field is set up
    fn check_argument(&self, _argument: &str) -> Result<(), String> {
        Ok(())
    }
}

impl<F> Validator for F
where
    F: Fn(&FieldContext<'_>) -> Verdict + Send + Sync,
{
    fn validate(&self, cx: &FieldContext<'_>) -> Verdict {
        self(cx)
    }
}

/// Reports the native constraint failure, if any
pub struct NativeValidator;

impl Validator for NativeValidator {
    fn validate(&self, cx: &FieldContext<'_>) -> Verdict {
        let validity = cx.validity();
        if validity.valid {
            Verdict::Pass
        } else if validity.message.is_empty() {
            Verdict::Fail
        } else {
            Verdict::FailWith(validity.message.clone())
        }
    }
}

/// Value must equal the value of the field named by the argument
pub struct MatchValidator {
    message: String,
}

impl MatchValidator {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Validator for MatchValidator {
    fn validate(&self, cx: &FieldContext<'_>) -> Verdict {
        let target = cx
            .field_value(cx.argument())
            .map(|value| value.as_text().into_owned())
            .unwrap_or_default();

        if cx.value().as_text() != target {
            Verdict::FailWith(self.message.clone())
        } else {
            Verdict::Pass
        }
    }

    fn check_argument(&self, argument: &str) -> Result<(), String> {
        if argument.is_empty() {
            return Err("a target field is required".to_string());
        }
        Ok(())
    }
}

/// Value must be at least as long as the argument: characters of text, or
/// selected options of a multi-select
pub struct MinLengthValidator {
    message: String,
}

impl MinLengthValidator {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Validator for MinLengthValidator {
    fn validate(&self, cx: &FieldContext<'_>) -> Verdict {
        let min = cx.argument().trim().parse::<usize>().unwrap_or(0);
        // a multi-select is as long as its selection
        let length = match cx.value() {
            FieldValue::Selected(options) => options.len(),
            other => other.as_text().chars().count(),
        };
        Verdict::from((length < min).then(|| self.message.clone()))
    }

    fn check_argument(&self, argument: &str) -> Result<(), String> {
        argument
            .trim()
            .parse::<usize>()
            .map(|_| ())
            .map_err(|_| format!("expected a character count, got '{}'", argument))
    }
}

/// Ordered name → validator mapping.
///
/// Iteration order is registration order; re-registering a name replaces the
/// rule in place, so a custom `match` still runs where the built-in did.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    entries: Vec<(String, Arc<dyn Validator>)>,
}

impl ValidatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `native`, `match` and `minlength`
    pub fn with_builtins(templates: &ErrorTemplates) -> Self {
        let mut registry = Self::new();
        registry.register(NATIVE, NativeValidator);
        registry.register(MATCH, MatchValidator::new(templates.mismatch.clone()));
        registry.register(MINLENGTH, MinLengthValidator::new(templates.minlength.clone()));
        registry
    }

    /// Register a validator, returning the one it replaced
    pub fn register(
        &mut self,
        name: impl Into<String>,
        validator: impl Validator + 'static,
    ) -> Option<Arc<dyn Validator>> {
        self.register_arc(name, Arc::new(validator))
    }

    pub fn register_arc(
        &mut self,
        name: impl Into<String>,
        validator: Arc<dyn Validator>,
    ) -> Option<Arc<dyn Validator>> {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, validator)),
            None => {
                self.entries.push((name, validator));
                None
            }
        }
    }

    pub fn resolve(&self, name: &str) -> Option<&Arc<dyn Validator>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, validator)| validator)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Validator>)> {
        self.entries
            .iter()
            .map(|(name, validator)| (name.as_str(), validator))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldDescriptor;
    use rstest::rstest;

    fn run(
        validator: &dyn Validator,
        field: &FieldDescriptor,
        value: &str,
        form: &HashMap<String, FieldValue>,
        argument: &str,
    ) -> Verdict {
        let value = FieldValue::text(value);
        let validity = Validity::valid();
        validator.validate(&FieldContext::new(field, &value, &validity, form, argument))
    }

    #[test]
    fn test_builtin_order() {
        let registry = ValidatorRegistry::with_builtins(&ErrorTemplates::default());
        assert_eq!(registry.names(), vec![NATIVE, MATCH, MINLENGTH]);
    }

    #[test]
    fn test_custom_appends_and_shadowing_keeps_position() {
        let mut registry = ValidatorRegistry::with_builtins(&ErrorTemplates::default());

        let shadowed = registry.register("even", |cx: &FieldContext<'_>| {
            Verdict::from_error(cx.value().as_text().len() % 2 == 1)
        });
        assert!(shadowed.is_none());

        let shadowed = registry.register(MATCH, |_: &FieldContext<'_>| Verdict::Pass);
        assert!(shadowed.is_some());
        assert_eq!(registry.names(), vec![NATIVE, MATCH, MINLENGTH, "even"]);
    }

    #[test]
    fn test_match_validator() {
        let field = FieldDescriptor::scalar("confirm").matches("password");
        let mut form = HashMap::new();
        form.insert("password".to_string(), FieldValue::text("longenough"));

        let validator = MatchValidator::new("Does not match");
        assert_eq!(run(&validator, &field, "longenough", &form, "password"), Verdict::Pass);
        assert_eq!(
            run(&validator, &field, "other", &form, "password"),
            Verdict::FailWith("Does not match".to_string())
        );
    }

    #[test]
    fn test_minlength_validator() {
        let field = FieldDescriptor::scalar("password").min_length(8);
        let form = HashMap::new();
        let validator = MinLengthValidator::new("Not long enough");

        assert_eq!(
            run(&validator, &field, "short", &form, "8"),
            Verdict::FailWith("Not long enough".to_string())
        );
        assert_eq!(run(&validator, &field, "longenough", &form, "8"), Verdict::Pass);
        // characters, not bytes
        assert_eq!(run(&validator, &field, "ééééé", &form, "5"), Verdict::Pass);
    }

    #[rstest]
    #[case::three_selected(&["a", "b", "c"], "2", true)]
    #[case::exactly_enough(&["a", "b"], "2", true)]
    #[case::too_few(&["a"], "2", false)]
    #[case::ten_selected(&["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"], "3", true)]
    fn test_minlength_counts_selected_options(
        #[case] selected: &[&str],
        #[case] min: &str,
        #[case] passes: bool,
    ) {
        let field = FieldDescriptor::multi_select("tags").min_length(2);
        let value = FieldValue::Selected(selected.iter().map(|s| s.to_string()).collect());
        let validity = Validity::valid();
        let form = HashMap::new();
        let cx = FieldContext::new(&field, &value, &validity, &form, min);

        let validator = MinLengthValidator::new("Not long enough");
        assert_eq!(validator.validate(&cx).is_pass(), passes);
    }

    #[test]
    fn test_minlength_argument_check() {
        let validator = MinLengthValidator::new("Not long enough");
        assert!(validator.check_argument("8").is_ok());
        assert!(validator.check_argument("eight").is_err());
    }

    #[test]
    fn test_native_validator_uses_validity() {
        let field = FieldDescriptor::scalar("email");
        let value = FieldValue::text("x");
        let form = HashMap::new();
        let validity = Validity::invalid(
            crate::constraint::ValidityReason::Type,
            "Please enter an email address.",
        );
        let cx = FieldContext::new(&field, &value, &validity, &form, "");
        assert_eq!(
            NativeValidator.validate(&cx),
            Verdict::FailWith("Please enter an email address.".to_string())
        );
    }
}
