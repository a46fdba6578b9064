// File: rusty-forms-live/src/render.rs
// Purpose: Feedback rendering interface and an in-memory renderer

use maud::{html, PreEscaped};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::FeedbackMarkers;

/// How error messages are inserted into the feedback area
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageFormat {
    /// Messages are escaped text
    #[default]
    Text,
    /// Messages are trusted, pre-escaped markup
    Html,
}

/// Visible state of a field's form group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupState {
    #[default]
    Neutral,
    Error,
    Success,
}

/// Shows validation feedback for fields and owns the submit control.
///
/// The engine calls these while it holds its field state, so implementations
/// must not call back into the engine.
pub trait Renderer: Send + Sync {
    /// Replace the field's feedback area with `errors`, saving the original
    /// content the first time.
    fn show_errors(
        &self,
        field: &str,
        errors: &[String],
        format: MessageFormat,
        feedback: &FeedbackMarkers,
    );

    /// Restore the original feedback content; a field with a value is
    /// marked successful.
    fn clear_errors(&self, field: &str, has_value: bool, feedback: &FeedbackMarkers);

    /// Return the field to its pre-validation display and forget the saved
    /// original content.
    fn restore(&self, field: &str, feedback: &FeedbackMarkers);

    fn focus(&self, field: &str);

    fn set_submit_disabled(&self, disabled: bool);
}

/// One field's feedback area
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackArea {
    /// Current content (markup)
    pub content: String,
    /// Content saved before the first error list replaced it
    original: Option<String>,
    pub group: GroupState,
    /// Feedback marker currently applied, if any
    pub marker: Option<String>,
}

#[derive(Debug, Default)]
struct RenderState {
    areas: HashMap<String, FeedbackArea>,
    shown: Vec<(String, Vec<String>)>,
    focused: Option<String>,
    submit_disabled: bool,
}

/// Renderer that keeps feedback areas in memory.
///
/// Useful headless and in tests; cloning shares the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryRenderer {
    state: Arc<Mutex<RenderState>>,
}

impl MemoryRenderer {
    /// Create a renderer with no feedback content
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pre-validation content of a field's feedback area
    pub fn with_content(self, field: impl Into<String>, content: impl Into<String>) -> Self {
        self.lock().areas.insert(
            field.into(),
            FeedbackArea {
                content: content.into(),
                ..FeedbackArea::default()
            },
        );
        self
    }

    fn lock(&self) -> MutexGuard<'_, RenderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn area(&self, field: &str) -> Option<FeedbackArea> {
        self.lock().areas.get(field).cloned()
    }

    pub fn content(&self, field: &str) -> Option<String> {
        self.lock().areas.get(field).map(|area| area.content.clone())
    }

    pub fn group(&self, field: &str) -> GroupState {
        self.lock()
            .areas
            .get(field)
            .map(|area| area.group)
            .unwrap_or_default()
    }

    /// Every error list shown for `field`, oldest first
    pub fn shown(&self, field: &str) -> Vec<Vec<String>> {
        self.lock()
            .shown
            .iter()
            .filter(|(name, _)| name == field)
            .map(|(_, errors)| errors.clone())
            .collect()
    }

    pub fn focused(&self) -> Option<String> {
        self.lock().focused.clone()
    }

    pub fn submit_disabled(&self) -> bool {
        self.lock().submit_disabled
    }
}

impl Renderer for MemoryRenderer {
    fn show_errors(
        &self,
        field: &str,
        errors: &[String],
        format: MessageFormat,
        feedback: &FeedbackMarkers,
    ) {
        if errors.is_empty() {
            return;
        }

        let mut state = self.lock();
        state.shown.push((field.to_string(), errors.to_vec()));

        let area = state.areas.entry(field.to_string()).or_default();
        if area.original.is_none() {
            area.original = Some(area.content.clone());
        }
        area.content = render_list(errors, format);
        area.group = GroupState::Error;
        area.marker = Some(feedback.error.clone());
    }

    fn clear_errors(&self, field: &str, has_value: bool, feedback: &FeedbackMarkers) {
        let mut state = self.lock();
        let area = state.areas.entry(field.to_string()).or_default();

        if let Some(original) = &area.original {
            area.content = original.clone();
        }
        if has_value {
            area.group = GroupState::Success;
            area.marker = Some(feedback.success.clone());
        } else {
            area.group = GroupState::Neutral;
            area.marker = None;
        }
    }

    fn restore(&self, field: &str, _feedback: &FeedbackMarkers) {
        let mut state = self.lock();
        if let Some(area) = state.areas.get_mut(field) {
            if let Some(original) = area.original.take() {
                area.content = original;
            }
            area.group = GroupState::Neutral;
            area.marker = None;
        }
    }

    fn focus(&self, field: &str) {
        self.lock().focused = Some(field.to_string());
    }

    fn set_submit_disabled(&self, disabled: bool) {
        self.lock().submit_disabled = disabled;
    }
}

/// Render messages as an unstyled list
pub fn render_list(errors: &[String], format: MessageFormat) -> String {
    html! {
        ul class="list-unstyled" {
            @for error in errors {
                @match format {
                    MessageFormat::Text => li { (error) },
                    MessageFormat::Html => li { (PreEscaped(error)) },
                }
            }
        }
    }
    .into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_render_list_escapes_text() {
        let html = render_list(&errors(&["a < b"]), MessageFormat::Text);
        assert_eq!(html, "<ul class=\"list-unstyled\"><li>a &lt; b</li></ul>");

        let html = render_list(&errors(&["<b>bold</b>"]), MessageFormat::Html);
        assert_eq!(html, "<ul class=\"list-unstyled\"><li><b>bold</b></li></ul>");

        let html = render_list(&errors(&["\"quoted\" & <tagged>"]), MessageFormat::Text);
        assert_eq!(
            html,
            "<ul class=\"list-unstyled\"><li>&quot;quoted&quot; &amp; &lt;tagged&gt;</li></ul>"
        );
    }

    #[test]
    fn test_show_then_clear_restores_original() {
        let feedback = FeedbackMarkers::default();
        let renderer = MemoryRenderer::new().with_content("email", "We never share it");

        renderer.show_errors("email", &errors(&["taken"]), MessageFormat::Text, &feedback);
        assert_eq!(renderer.group("email"), GroupState::Error);
        assert_eq!(
            renderer.area("email").unwrap().marker.as_deref(),
            Some("glyphicon-remove")
        );

        // a second show must not overwrite the saved original
        renderer.show_errors("email", &errors(&["other"]), MessageFormat::Text, &feedback);
        renderer.clear_errors("email", true, &feedback);

        assert_eq!(renderer.content("email").as_deref(), Some("We never share it"));
        assert_eq!(renderer.group("email"), GroupState::Success);
        assert_eq!(renderer.shown("email").len(), 2);
    }

    #[test]
    fn test_clear_without_value_is_neutral() {
        let feedback = FeedbackMarkers::default();
        let renderer = MemoryRenderer::new();
        renderer.clear_errors("nick", false, &feedback);
        assert_eq!(renderer.group("nick"), GroupState::Neutral);
        assert_eq!(renderer.area("nick").unwrap().marker, None);
    }

    #[test]
    fn test_restore() {
        let feedback = FeedbackMarkers::default();
        let renderer = MemoryRenderer::new().with_content("name", "");

        renderer.show_errors("name", &errors(&["Required"]), MessageFormat::Text, &feedback);
        renderer.restore("name", &feedback);

        let area = renderer.area("name").unwrap();
        assert_eq!(area, FeedbackArea::default());
    }

    #[test]
    fn test_empty_errors_are_not_shown() {
        let renderer = MemoryRenderer::new();
        renderer.show_errors("x", &[], MessageFormat::Text, &FeedbackMarkers::default());
        assert!(renderer.area("x").is_none());
    }
}
