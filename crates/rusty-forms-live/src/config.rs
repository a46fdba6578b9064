// File: rusty-forms-live/src/config.rs
// Purpose: Engine options, loadable from TOML

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::render::MessageFormat;

/// Form engine options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormOptions {
    /// Debounce delay in milliseconds for deferred display and remote checks
    #[serde(default = "default_delay")]
    pub delay: u64,

    /// Render messages as pre-escaped markup instead of text
    #[serde(default = "default_false")]
    pub html: bool,

    /// Disable the submit control while the form is invalid or incomplete
    #[serde(default = "default_true")]
    pub disable: bool,

    /// Focus the first invalid field after a full-form validation
    #[serde(default = "default_true")]
    pub focus: bool,

    /// Base URL relative remote endpoints are resolved against by the
    /// built-in HTTP transport
    #[serde(default)]
    pub remote_base: Option<String>,

    #[serde(default)]
    pub errors: ErrorTemplates,

    #[serde(default)]
    pub feedback: FeedbackMarkers,
}

/// Default messages of the built-in validators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorTemplates {
    #[serde(rename = "match", default = "default_mismatch")]
    pub mismatch: String,

    #[serde(default = "default_minlength")]
    pub minlength: String,

    /// Used when a validator fails without any message
    #[serde(default = "default_fallback")]
    pub fallback: String,
}

/// Visual marker identifiers for success/error feedback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackMarkers {
    #[serde(default = "default_success_marker")]
    pub success: String,

    #[serde(default = "default_error_marker")]
    pub error: String,
}

// Default values
fn default_delay() -> u64 {
    500
}

fn default_mismatch() -> String {
    "Does not match".to_string()
}

fn default_minlength() -> String {
    "Not long enough".to_string()
}

fn default_fallback() -> String {
    "Invalid value".to_string()
}

fn default_success_marker() -> String {
    "glyphicon-ok".to_string()
}

fn default_error_marker() -> String {
    "glyphicon-remove".to_string()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

// Default implementations
impl Default for FormOptions {
    fn default() -> Self {
        Self {
            delay: default_delay(),
            html: false,
            disable: true,
            focus: true,
            remote_base: None,
            errors: ErrorTemplates::default(),
            feedback: FeedbackMarkers::default(),
        }
    }
}

impl Default for ErrorTemplates {
    fn default() -> Self {
        Self {
            mismatch: default_mismatch(),
            minlength: default_minlength(),
            fallback: default_fallback(),
        }
    }
}

impl Default for FeedbackMarkers {
    fn default() -> Self {
        Self {
            success: default_success_marker(),
            error: default_error_marker(),
        }
    }
}

impl FormOptions {
    /// Load options from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Missing file means defaults
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read form options: {:?}", path))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse form options: {:?}", path))
    }

    /// Parse options from TOML text; empty text means defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(toml::from_str(content)?)
    }

    pub fn delay_duration(&self) -> Duration {
        Duration::from_millis(self.delay)
    }

    pub fn message_format(&self) -> MessageFormat {
        if self.html {
            MessageFormat::Html
        } else {
            MessageFormat::Text
        }
    }

    pub fn with_delay(mut self, millis: u64) -> Self {
        self.delay = millis;
        self
    }

    pub fn with_html(mut self, html: bool) -> Self {
        self.html = html;
        self
    }

    pub fn with_disable(mut self, disable: bool) -> Self {
        self.disable = disable;
        self
    }

    pub fn with_focus(mut self, focus: bool) -> Self {
        self.focus = focus;
        self
    }

    pub fn with_remote_base(mut self, base: impl Into<String>) -> Self {
        self.remote_base = Some(base.into());
        self
    }
}
