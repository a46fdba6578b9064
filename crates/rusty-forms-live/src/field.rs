// File: rusty-forms-live/src/field.rs
// Purpose: Field descriptors, value kinds and value extraction

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use crate::constraint::ValidityReason;

/// How the current value of a control is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueKind {
    /// Single checkbox - value is its checked state
    Checkbox,
    /// Same-named radio inputs validated as one field
    RadioGroup,
    /// `<select multiple>` - value is the selected options
    MultiSelect,
    /// Any other input - value is the raw string
    Scalar,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Checkbox => write!(f, "checkbox"),
            ValueKind::RadioGroup => write!(f, "radio-group"),
            ValueKind::MultiSelect => write!(f, "multi-select"),
            ValueKind::Scalar => write!(f, "scalar"),
        }
    }
}

/// Current value of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldValue {
    /// Checked state of a checkbox
    Checked(bool),
    /// Checked member of a radio group, if any
    Choice(Option<String>),
    /// Selected options of a multi-select
    Selected(Vec<String>),
    /// Raw text of a scalar input
    Text(String),
}

impl FieldValue {
    /// The "nothing entered yet" value for a kind
    pub fn empty(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Checkbox => FieldValue::Checked(false),
            ValueKind::RadioGroup => FieldValue::Choice(None),
            ValueKind::MultiSelect => FieldValue::Selected(Vec::new()),
            ValueKind::Scalar => FieldValue::Text(String::new()),
        }
    }

    /// Shorthand for a scalar value
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            FieldValue::Checked(_) => ValueKind::Checkbox,
            FieldValue::Choice(_) => ValueKind::RadioGroup,
            FieldValue::Selected(_) => ValueKind::MultiSelect,
            FieldValue::Text(_) => ValueKind::Scalar,
        }
    }

    /// Whether the field counts as filled in for validation purposes.
    ///
    /// Whitespace-only text still counts; see [`FieldValue::is_blank`].
    pub fn has_value(&self) -> bool {
        match self {
            FieldValue::Checked(checked) => *checked,
            FieldValue::Choice(choice) => choice.is_some(),
            FieldValue::Selected(options) => !options.is_empty(),
            FieldValue::Text(text) => !text.is_empty(),
        }
    }

    /// Whether a required field holding this value is incomplete
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            other => !other.has_value(),
        }
    }

    /// String form used by text comparisons and remote queries
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Checked(checked) => Cow::Owned(checked.to_string()),
            FieldValue::Choice(choice) => Cow::Borrowed(choice.as_deref().unwrap_or("")),
            FieldValue::Selected(options) => Cow::Owned(options.len().to_string()),
            FieldValue::Text(text) => Cow::Borrowed(text),
        }
    }
}

/// Native input type, as far as constraint checking cares
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Text,
    Email,
    Url,
    Number,
}

/// Native constraint attributes (`type`, `pattern`, `min`, `max`, `step`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeAttrs {
    #[serde(default, rename = "type")]
    pub input_type: InputType,

    #[serde(default)]
    pub pattern: Option<String>,

    #[serde(default)]
    pub min: Option<f64>,

    #[serde(default)]
    pub max: Option<f64>,

    #[serde(default)]
    pub step: Option<f64>,
}

/// Per-field custom error messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorOverrides {
    /// Keyed by validator name (`minlength`, `match`, `remote`, custom names)
    #[serde(default)]
    pub validators: HashMap<String, String>,

    /// Keyed by the native validity reason that failed
    #[serde(default)]
    pub reasons: HashMap<ValidityReason, String>,

    /// Used when nothing more specific is configured
    #[serde(default)]
    pub generic: Option<String>,
}

/// Everything the engine needs to know about one field
///
/// Produced by field discovery; the engine validates it once at setup and
/// never re-reads markup afterwards.
///
/// # Example
///
/// ```
/// use rusty_forms_live::FieldDescriptor;
///
/// let password = FieldDescriptor::scalar("password").required().min_length(8);
/// let confirm = FieldDescriptor::scalar("confirm").matches("password");
/// assert_eq!(confirm.validators.get("match").map(String::as_str), Some("password"));
/// # let _ = password;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub identifier: String,

    pub kind: ValueKind,

    #[serde(default)]
    pub required: bool,

    /// Enabled validators mapped to their argument (empty for flags)
    #[serde(default)]
    pub validators: BTreeMap<String, String>,

    #[serde(default)]
    pub messages: ErrorOverrides,

    /// Endpoint queried once local validators pass
    #[serde(default)]
    pub remote: Option<String>,

    #[serde(default)]
    pub native: NativeAttrs,

    /// Value present when the form was discovered
    #[serde(default)]
    pub value: Option<FieldValue>,

    /// The page was rendered with a server-side error for this field
    #[serde(default)]
    pub server_error: bool,
}

impl FieldDescriptor {
    pub fn new(identifier: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            required: false,
            validators: BTreeMap::new(),
            messages: ErrorOverrides::default(),
            remote: None,
            native: NativeAttrs::default(),
            value: None,
            server_error: false,
        }
    }

    pub fn scalar(identifier: impl Into<String>) -> Self {
        Self::new(identifier, ValueKind::Scalar)
    }

    pub fn checkbox(identifier: impl Into<String>) -> Self {
        Self::new(identifier, ValueKind::Checkbox)
    }

    pub fn radio_group(identifier: impl Into<String>) -> Self {
        Self::new(identifier, ValueKind::RadioGroup)
    }

    pub fn multi_select(identifier: impl Into<String>) -> Self {
        Self::new(identifier, ValueKind::MultiSelect)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Enable a validator by name with an argument
    pub fn validator(mut self, name: impl Into<String>, argument: impl Into<String>) -> Self {
        self.validators.insert(name.into(), argument.into());
        self
    }

    pub fn min_length(self, min: usize) -> Self {
        self.validator(crate::registry::MINLENGTH, min.to_string())
    }

    /// Require equality with another field's value
    pub fn matches(self, target: impl Into<String>) -> Self {
        self.validator(crate::registry::MATCH, target)
    }

    /// Message used when the named validator fails
    pub fn message(mut self, validator: impl Into<String>, message: impl Into<String>) -> Self {
        self.messages.validators.insert(validator.into(), message.into());
        self
    }

    /// Message used when the native check fails for `reason`
    pub fn reason_message(mut self, reason: ValidityReason, message: impl Into<String>) -> Self {
        self.messages.reasons.insert(reason, message.into());
        self
    }

    pub fn generic_message(mut self, message: impl Into<String>) -> Self {
        self.messages.generic = Some(message.into());
        self
    }

    pub fn remote(mut self, endpoint: impl Into<String>) -> Self {
        self.remote = Some(endpoint.into());
        self
    }

    pub fn input_type(mut self, input_type: InputType) -> Self {
        self.native.input_type = input_type;
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.native.pattern = Some(pattern.into());
        self
    }

    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.native.min = min;
        self.native.max = max;
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.native.step = Some(step);
        self
    }

    pub fn value(mut self, value: FieldValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn server_error(mut self) -> Self {
        self.server_error = true;
        self
    }

    /// Identifier of the field this one must equal, if `match` is enabled
    pub fn match_target(&self) -> Option<&str> {
        self.validators
            .get(crate::registry::MATCH)
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(FieldValue::Checked(true), true, false)]
    #[case(FieldValue::Checked(false), false, true)]
    #[case(FieldValue::Choice(Some("b".into())), true, false)]
    #[case(FieldValue::Choice(None), false, true)]
    #[case(FieldValue::Selected(vec!["x".into()]), true, false)]
    #[case(FieldValue::Selected(vec![]), false, true)]
    #[case(FieldValue::text("hi"), true, false)]
    #[case(FieldValue::text("   "), true, true)]
    #[case(FieldValue::text(""), false, true)]
    fn test_value_presence(#[case] value: FieldValue, #[case] has: bool, #[case] blank: bool) {
        assert_eq!(value.has_value(), has);
        assert_eq!(value.is_blank(), blank);
    }

    #[test]
    fn test_empty_matches_kind() {
        for kind in [
            ValueKind::Checkbox,
            ValueKind::RadioGroup,
            ValueKind::MultiSelect,
            ValueKind::Scalar,
        ] {
            let value = FieldValue::empty(kind);
            assert_eq!(value.kind(), kind);
            assert!(!value.has_value());
        }
    }

    #[test]
    fn test_as_text() {
        assert_eq!(FieldValue::Checked(true).as_text(), "true");
        assert_eq!(FieldValue::Choice(None).as_text(), "");
        assert_eq!(
            FieldValue::Selected(vec!["a".into(), "b".into()]).as_text(),
            "2"
        );
    }

    #[test]
    fn test_descriptor_builder() {
        let field = FieldDescriptor::scalar("confirm")
            .required()
            .matches("password")
            .message("match", "Passwords differ")
            .remote("/check");

        assert!(field.required);
        assert_eq!(field.match_target(), Some("password"));
        assert_eq!(
            field.messages.validators.get("match").map(String::as_str),
            Some("Passwords differ")
        );
        assert_eq!(field.remote.as_deref(), Some("/check"));
    }

    #[test]
    fn test_descriptor_from_json() {
        let json = r#"{
            "identifier": "age",
            "kind": "scalar",
            "required": true,
            "validators": { "minlength": "2" },
            "messages": { "reasons": { "max": "Too old" }, "generic": "Bad age" },
            "native": { "type": "number", "max": 120 }
        }"#;
        let field: FieldDescriptor = serde_json::from_str(json).unwrap();

        assert_eq!(field.kind, ValueKind::Scalar);
        assert_eq!(field.native.input_type, InputType::Number);
        assert_eq!(field.native.max, Some(120.0));
        assert_eq!(
            field.messages.reasons.get(&ValidityReason::Max).map(String::as_str),
            Some("Too old")
        );
        assert_eq!(field.messages.generic.as_deref(), Some("Bad age"));
    }
}
