//! # Keyboard Mapping
//!
//! Maps key names (as reported by the host's key events) to navigation
//! actions, and classifies the focused element so that keystrokes meant
//! for text editing are never hijacked.

use serde::{Deserialize, Serialize};

/// A navigation action triggered from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavAction {
    /// Advance one section.
    Next,
    /// Go back one section.
    Prev,
    /// Jump to the first section.
    First,
    /// Jump to the last section.
    Last,
}

impl NavAction {
    /// Map a key name to an action. Unknown keys map to `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowDown" | "ArrowRight" | "PageDown" | " " | "Space" | "Spacebar" => {
                Some(Self::Next)
            }
            "ArrowUp" | "ArrowLeft" | "PageUp" => Some(Self::Prev),
            "Home" => Some(Self::First),
            "End" => Some(Self::Last),
            _ => None,
        }
    }
}

/// What currently holds keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusContext {
    /// Nothing focused (document body).
    #[default]
    None,
    /// A text-entry `<input>`.
    TextInput,
    /// A `<textarea>`.
    TextArea,
    /// A content-editable region.
    ContentEditable,
    /// Any other focusable element (buttons, links, checkboxes).
    Other,
}

/// `<input type=…>` values that accept free text.
const TEXT_INPUT_TYPES: &[&str] = &[
    "text", "search", "email", "url", "tel", "password", "number", "date",
    "datetime-local", "month", "time", "week",
];

impl FocusContext {
    /// Classify a focused element from its tag, `type` attribute and
    /// content-editable flag.
    pub fn from_element(tag: &str, input_type: Option<&str>, content_editable: bool) -> Self {
        if content_editable {
            return Self::ContentEditable;
        }
        match tag.to_ascii_lowercase().as_str() {
            "textarea" => Self::TextArea,
            "input" => {
                let kind = input_type.unwrap_or("text").to_ascii_lowercase();
                if TEXT_INPUT_TYPES.contains(&kind.as_str()) {
                    Self::TextInput
                } else {
                    Self::Other
                }
            }
            "body" | "html" | "" => Self::None,
            _ => Self::Other,
        }
    }

    /// Whether keystrokes belong to a text editor.
    pub fn captures_keys(&self) -> bool {
        matches!(self, Self::TextInput | Self::TextArea | Self::ContentEditable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_map_to_actions() {
        assert_eq!(NavAction::from_key("ArrowDown"), Some(NavAction::Next));
        assert_eq!(NavAction::from_key(" "), Some(NavAction::Next));
        assert_eq!(NavAction::from_key("PageUp"), Some(NavAction::Prev));
        assert_eq!(NavAction::from_key("Home"), Some(NavAction::First));
        assert_eq!(NavAction::from_key("End"), Some(NavAction::Last));
        assert_eq!(NavAction::from_key("a"), None);
    }

    #[test]
    fn text_entry_focus_captures_keys() {
        assert!(FocusContext::from_element("INPUT", None, false).captures_keys());
        assert!(FocusContext::from_element("input", Some("email"), false).captures_keys());
        assert!(FocusContext::from_element("textarea", None, false).captures_keys());
        assert!(FocusContext::from_element("div", None, true).captures_keys());
    }

    #[test]
    fn non_text_focus_does_not_capture() {
        assert!(!FocusContext::from_element("input", Some("checkbox"), false).captures_keys());
        assert!(!FocusContext::from_element("button", None, false).captures_keys());
        assert_eq!(FocusContext::from_element("body", None, false), FocusContext::None);
    }
}
