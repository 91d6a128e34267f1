//! Presentation hints attached to a parameter.
//!
//! The engine never renders anything; these hints only travel to the
//! presentation layer through [`ParamView`](super::ParamView) and gate the
//! validation rules that keep a widget renderable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of control a presentation layer should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    /// No control.
    #[default]
    None,
    /// Drop-down list over `choices`.
    Combo,
    /// Check box.
    Check,
    /// Radio group over `choices`.
    Radio,
    /// Slider over `range`.
    Slider,
    /// File chooser producing a path string.
    File,
    /// Table editor.
    Table,
    /// Free text input.
    LineEdit,
    /// Push button.
    PushButton,
}

impl WidgetKind {
    /// Returns true if the widget cannot be rendered without a choice list.
    #[must_use]
    pub fn requires_choices(&self) -> bool {
        matches!(self, Self::Combo | Self::Radio)
    }

    /// Returns true if the widget cannot be rendered without a numeric range.
    #[must_use]
    pub fn requires_range(&self) -> bool {
        matches!(self, Self::Slider)
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Combo => write!(f, "combo"),
            Self::Check => write!(f, "check"),
            Self::Radio => write!(f, "radio"),
            Self::Slider => write!(f, "slider"),
            Self::File => write!(f, "file"),
            Self::Table => write!(f, "table"),
            Self::LineEdit => write!(f, "line_edit"),
            Self::PushButton => write!(f, "push_button"),
        }
    }
}

/// Presentation metadata for one parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiHints {
    /// Whether the parameter is shown to the user at all.
    #[serde(default)]
    pub show_in_ui: bool,
    /// The control to render.
    #[serde(default)]
    pub widget: WidgetKind,
    /// Allowed values for combo and radio widgets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

impl UiHints {
    /// Creates hints for a hidden parameter.
    #[must_use]
    pub fn hidden() -> Self {
        Self::default()
    }

    /// Creates hints for a visible parameter rendered with `widget`.
    #[must_use]
    pub fn shown(widget: WidgetKind) -> Self {
        Self {
            show_in_ui: true,
            widget,
            choices: None,
        }
    }

    /// Sets the choice list.
    #[must_use]
    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    /// Returns the position of `choice` in the choice list.
    #[must_use]
    pub fn choice_index(&self, choice: &str) -> Option<usize> {
        self.choices.as_ref()?.iter().position(|c| c == choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_requirements() {
        assert!(WidgetKind::Combo.requires_choices());
        assert!(WidgetKind::Radio.requires_choices());
        assert!(!WidgetKind::Slider.requires_choices());
        assert!(WidgetKind::Slider.requires_range());
        assert!(!WidgetKind::File.requires_range());
    }

    #[test]
    fn test_choice_index() {
        let hints = UiHints::shown(WidgetKind::Combo).with_choices(["One", "Two", "Three"]);
        assert_eq!(hints.choice_index("Two"), Some(1));
        assert_eq!(hints.choice_index("Four"), None);
        assert_eq!(UiHints::hidden().choice_index("Two"), None);
    }

    #[test]
    fn test_widget_serialize() {
        let json = serde_json::to_string(&WidgetKind::LineEdit).unwrap();
        assert_eq!(json, r#""line_edit""#);
        assert_eq!(WidgetKind::LineEdit.to_string(), "line_edit");
    }
}
