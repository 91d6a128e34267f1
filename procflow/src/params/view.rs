//! Read-only snapshots handed to a presentation layer.

use super::{Bound, Parameter, Range, WidgetKind};
use crate::core::{Value, ValueKind};
use serde::Serialize;

/// Where a parameter's value comes from, as seen by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BindingView {
    /// Nothing bound and nothing to fall back to.
    Unset,
    /// A literal value, user-edited or materialised from a default.
    Literal,
    /// Another stage's output.
    Slot {
        /// The producing stage.
        stage: String,
        /// The output index.
        index: usize,
    },
}

/// Display model for one parameter.
#[derive(Debug, Clone, Serialize)]
pub struct ParamView {
    /// Display label.
    pub name: Option<String>,
    /// Declared kind.
    pub kind: ValueKind,
    /// Whether the parameter should be shown.
    pub show_in_ui: bool,
    /// Control to render.
    pub widget: WidgetKind,
    /// Allowed values for combo and radio widgets.
    pub choices: Option<Vec<String>>,
    /// Numeric range for sliders.
    pub range: Option<Range>,
    /// JSON summary of the resolved value.
    pub current: serde_json::Value,
    /// Position of the resolved value in `choices`.
    pub selected_index: Option<usize>,
    /// Where the value comes from.
    pub binding: BindingView,
    /// The resolved value itself.
    #[serde(skip)]
    pub value: Value,
}

impl ParamView {
    pub(super) fn new(param: &Parameter, value: Value) -> Self {
        let ui = param.ui();
        let binding = match param.current() {
            None => BindingView::Unset,
            Some(Bound::Literal(_)) => BindingView::Literal,
            Some(Bound::Slot(slot_ref)) => BindingView::Slot {
                stage: slot_ref.stage().to_string(),
                index: slot_ref.index(),
            },
        };
        let selected_index = if ui.widget.requires_choices() {
            value.as_str().and_then(|s| ui.choice_index(s))
        } else {
            None
        };
        Self {
            name: param.name().map(str::to_string),
            kind: param.kind(),
            show_in_ui: ui.show_in_ui,
            widget: ui.widget,
            choices: ui.choices.clone(),
            range: param.range(),
            current: value.to_json(),
            selected_index,
            binding,
            value,
        }
    }
}

/// Display model for one stage: the tab a presentation layer renders.
#[derive(Debug, Clone, Serialize)]
pub struct StageView {
    /// Stage name.
    pub stage: String,
    /// Operation name.
    pub operation: String,
    /// Parameters in positional order.
    pub params: Vec<ParamView>,
    /// Number of allocated output slots.
    pub outputs: usize,
}

impl StageView {
    /// Returns only the parameters flagged for display.
    pub fn visible_params(&self) -> impl Iterator<Item = &ParamView> {
        self.params.iter().filter(|p| p.show_in_ui)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SlotRef, ValueSlot};

    #[test]
    fn test_combo_view_selects_current() {
        let mut param = Parameter::choice(["One", "Two", "Three"])
            .named("mode")
            .with_default("Two");

        let view = param.describe();
        assert_eq!(view.widget, WidgetKind::Combo);
        assert_eq!(view.selected_index, Some(1));
        assert_eq!(view.current, serde_json::json!("Two"));
        assert_eq!(view.binding, BindingView::Literal);
    }

    #[test]
    fn test_slot_view() {
        let slot = ValueSlot::with_value(12);
        let mut param = Parameter::int().bound_to(SlotRef::new("count", 0, slot));

        let view = param.describe();
        assert_eq!(
            view.binding,
            BindingView::Slot {
                stage: "count".to_string(),
                index: 0
            }
        );
        assert_eq!(view.value, Value::Int(12));
        assert!(!view.show_in_ui);
    }

    #[test]
    fn test_view_serializes_without_raw_value() {
        let mut param = Parameter::slider(0.0, 100.0).named("threshold1");
        let json = serde_json::to_value(param.describe()).unwrap();

        assert_eq!(json["widget"], "slider");
        assert_eq!(json["current"], 50.0);
        assert_eq!(json["range"]["max"], 100.0);
        assert_eq!(json["binding"]["type"], "literal");
        assert!(json.get("value").is_none());
    }
}
