// File: rusty-forms-live/src/error.rs
// Purpose: Error types surfaced to the integrator

use crate::field::ValueKind;

/// A field set that cannot be validated as described.
///
/// Reported when the engine is initialized or a field is added, never to the
/// end user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Field identifier must not be empty")]
    EmptyIdentifier,

    #[error("Field '{0}' is declared more than once")]
    DuplicateField(String),

    #[error("Field '{field}' enables unknown validator '{validator}'")]
    UnknownValidator { field: String, validator: String },

    #[error("Field '{field}' has an invalid '{validator}' argument: {reason}")]
    InvalidArgument {
        field: String,
        validator: String,
        reason: String,
    },

    #[error("Field '{field}' must match unknown field '{target}'")]
    UnknownMatchTarget { field: String, target: String },

    #[error("Field '{field}' has an invalid pattern: {reason}")]
    InvalidPattern { field: String, reason: String },

    #[error("Initial value of field '{field}' is not a {expected} value")]
    ValueKind { field: String, expected: ValueKind },

    #[error("Remote base URL is invalid: {0}")]
    InvalidRemoteBase(String),

    #[error("Field '{field}' has a remote endpoint the HTTP transport cannot reach: {reason}")]
    InvalidEndpoint { field: String, reason: String },

    #[error("Field '{target}' cannot be removed while '{dependent}' must match it")]
    TargetInUse { target: String, dependent: String },
}

/// Misuse of the engine's public operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Value for field '{field}' must be a {expected} value")]
    ValueKind { field: String, expected: ValueKind },

    #[error("Form engine has been destroyed")]
    Destroyed,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A remote check answered with a failure (or never answered)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Remote check failed: {reason}")]
pub struct RemoteCheckFailure {
    pub reason: String,
}

impl RemoteCheckFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for RemoteCheckFailure {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_field() {
        let err = ConfigError::UnknownMatchTarget {
            field: "confirm".to_string(),
            target: "pasword".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Field 'confirm' must match unknown field 'pasword'"
        );

        let err: EngineError = ConfigError::DuplicateField("email".to_string()).into();
        assert_eq!(err.to_string(), "Field 'email' is declared more than once");
    }

    #[test]
    fn test_value_kind_display() {
        let err = EngineError::ValueKind {
            field: "terms".to_string(),
            expected: ValueKind::Checkbox,
        };
        assert_eq!(err.to_string(), "Value for field 'terms' must be a checkbox value");
    }
}
