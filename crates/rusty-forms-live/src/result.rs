// File: rusty-forms-live/src/result.rs
// Purpose: Ordered, de-duplicated error list for one field

use serde::{Deserialize, Serialize};

/// Errors for one field at one point in time.
///
/// Empty means valid. Messages keep the order they were pushed in and a
/// message already present (or an empty one) is never added twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationResult {
    errors: Vec<String>,
}

impl ValidationResult {
    /// Create an empty (valid) result
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message; returns false if it was empty or already present
    pub fn push(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        if message.is_empty() || self.errors.contains(&message) {
            return false;
        }
        self.errors.push(message);
        true
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn first(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }
}

impl<S: Into<String>> FromIterator<S> for ValidationResult {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut result = Self::new();
        for message in iter {
            result.push(message);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_push_deduplicates() {
        let mut result = ValidationResult::new();
        assert!(result.push("Not long enough"));
        assert!(result.push("Does not match"));
        assert!(!result.push("Not long enough"));

        assert_eq!(result.errors(), &["Not long enough", "Does not match"]);
    }

    #[test]
    fn test_push_rejects_empty() {
        let mut result = ValidationResult::new();
        assert!(!result.push(""));
        assert!(result.is_valid());
    }

    #[test]
    fn test_collect_keeps_first_occurrence_order() {
        let result: ValidationResult = ["b", "a", "b", "", "c", "a"].into_iter().collect();
        assert_eq!(result.into_errors(), vec!["b", "a", "c"]);
    }
}
