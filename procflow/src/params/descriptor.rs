//! Parameter descriptors and their resolution rules.

use super::{ParamView, UiHints, WidgetKind};
use crate::core::{SlotRef, Value, ValueKind};
use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};

/// A closed numeric interval used for sliders and midpoint defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl Range {
    /// Creates a range.
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Arithmetic midpoint of the bounds.
    #[must_use]
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    /// Returns true if `value` lies within the bounds.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Checks that the bounds are finite and ordered.
    ///
    /// # Errors
    ///
    /// Returns a `PARAM-RANGE` configuration error otherwise.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.min.is_finite() && self.max.is_finite() && self.min <= self.max {
            Ok(())
        } else {
            Err(ConfigurationError::range(self.min, self.max))
        }
    }
}

/// What a parameter's current value is bound to.
#[derive(Debug, Clone)]
pub enum Bound {
    /// A concrete value.
    Literal(Value),
    /// An output slot of another stage, read at resolution time.
    Slot(SlotRef),
}

impl Bound {
    /// Returns the concrete value, reading through a slot reference.
    #[must_use]
    pub fn resolve(&self) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Slot(slot_ref) => slot_ref.get(),
        }
    }

    /// Returns the slot reference, if bound to one.
    #[must_use]
    pub fn as_slot(&self) -> Option<&SlotRef> {
        match self {
            Self::Slot(slot_ref) => Some(slot_ref),
            Self::Literal(_) => None,
        }
    }
}

impl From<Value> for Bound {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<SlotRef> for Bound {
    fn from(slot_ref: SlotRef) -> Self {
        Self::Slot(slot_ref)
    }
}

/// Describes one positional argument of an operation.
///
/// The effective value is the first of: an explicit current binding, the
/// default, the midpoint of the range, or `Value::None`. The first
/// resolution caches a chosen default or midpoint as the current binding.
#[derive(Debug, Clone, Default)]
pub struct Parameter {
    name: Option<String>,
    kind: ValueKind,
    default: Option<Value>,
    range: Option<Range>,
    current: Option<Bound>,
    ui: UiHints,
}

impl Parameter {
    /// Creates a hidden parameter of the given kind with no value.
    #[must_use]
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// A string parameter.
    #[must_use]
    pub fn string() -> Self {
        Self::new(ValueKind::Str)
    }

    /// An integer parameter.
    #[must_use]
    pub fn int() -> Self {
        Self::new(ValueKind::Int)
    }

    /// A floating point parameter.
    #[must_use]
    pub fn double() -> Self {
        Self::new(ValueKind::Double)
    }

    /// A boolean parameter.
    #[must_use]
    pub fn boolean() -> Self {
        Self::new(ValueKind::Bool)
    }

    /// An image parameter.
    #[must_use]
    pub fn image() -> Self {
        Self::new(ValueKind::Image)
    }

    /// An array parameter.
    #[must_use]
    pub fn array() -> Self {
        Self::new(ValueKind::Array)
    }

    /// A visible file path parameter.
    #[must_use]
    pub fn file() -> Self {
        Self::new(ValueKind::Str).with_widget(WidgetKind::File)
    }

    /// A visible combo box over `choices`.
    #[must_use]
    pub fn choice<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ValueKind::Enum)
            .with_widget(WidgetKind::Combo)
            .with_choices(choices)
    }

    /// A visible slider over `[min, max]`.
    #[must_use]
    pub fn slider(min: f64, max: f64) -> Self {
        Self::new(ValueKind::Double)
            .with_widget(WidgetKind::Slider)
            .with_range(min, max)
    }

    /// Sets a display label.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the numeric range.
    #[must_use]
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some(Range::new(min, max));
        self
    }

    /// Sets an explicit literal value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.current = Some(Bound::Literal(value.into()));
        self
    }

    /// Binds the parameter to another stage's output.
    #[must_use]
    pub fn bound_to(mut self, slot_ref: SlotRef) -> Self {
        self.current = Some(Bound::Slot(slot_ref));
        self
    }

    /// Shows the parameter with the given widget.
    #[must_use]
    pub fn with_widget(mut self, widget: WidgetKind) -> Self {
        self.ui.show_in_ui = true;
        self.ui.widget = widget;
        self
    }

    /// Sets the choice list.
    #[must_use]
    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ui = self.ui.with_choices(choices);
        self
    }

    /// Hides the parameter from the presentation layer.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.ui.show_in_ui = false;
        self
    }

    /// The display label, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The declared kind.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// The default value, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// The numeric range, if any.
    #[must_use]
    pub fn range(&self) -> Option<Range> {
        self.range
    }

    /// The current binding, if any.
    #[must_use]
    pub fn current(&self) -> Option<&Bound> {
        self.current.as_ref()
    }

    /// The slot this parameter reads from, if bound to one.
    #[must_use]
    pub fn slot_ref(&self) -> Option<&SlotRef> {
        self.current.as_ref().and_then(Bound::as_slot)
    }

    /// The presentation hints.
    #[must_use]
    pub fn ui(&self) -> &UiHints {
        &self.ui
    }

    /// Resolves the parameter to a concrete value.
    ///
    /// A missing binding, or a literal `Value::None`, is filled from the
    /// default or the range midpoint and kept. A slot binding is read for
    /// this call only, so the next resolution sees whatever the upstream
    /// stage wrote since.
    pub fn resolve(&mut self) -> Value {
        if matches!(self.current, None | Some(Bound::Literal(Value::None))) {
            if let Some(value) = self.fallback() {
                self.current = Some(Bound::Literal(value));
            }
        }
        self.current.as_ref().map_or(Value::None, Bound::resolve)
    }

    fn fallback(&self) -> Option<Value> {
        if let Some(default) = self.default.as_ref().filter(|d| !d.is_none()) {
            return Some(default.clone());
        }
        self.range.map(|range| Value::Double(range.midpoint()))
    }

    /// Stores a literal value after checking it against the choice list.
    ///
    /// # Errors
    ///
    /// Returns a `PARAM-CHOICE` configuration error if the parameter uses a
    /// combo or radio widget and `value` is not one of its choices.
    pub fn set_value(&mut self, value: impl Into<Value>) -> Result<(), ConfigurationError> {
        let value = value.into();
        self.check_choice(&value)?;
        self.current = Some(Bound::Literal(value));
        Ok(())
    }

    /// Stores a literal value without checking choices.
    pub fn set_value_unchecked(&mut self, value: impl Into<Value>) {
        self.current = Some(Bound::Literal(value.into()));
    }

    /// Binds the parameter to another stage's output.
    pub fn bind(&mut self, slot_ref: SlotRef) {
        self.current = Some(Bound::Slot(slot_ref));
    }

    /// Drops the current binding so the next resolution falls back again.
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Checks that the presentation hints and value metadata are consistent.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a combo/radio widget lacks
    /// choices, a slider lacks a range, the range is malformed, or a literal
    /// or default is outside the choice list.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let Some(range) = self.range {
            range.validate()?;
        }
        let widget = self.ui.widget;
        if widget.requires_choices() && self.ui.choices.as_ref().map_or(true, Vec::is_empty) {
            return Err(ConfigurationError::widget(format!(
                "Parameter {} uses a {widget} widget but has no choices",
                self.label()
            )));
        }
        if widget.requires_range() && self.range.is_none() {
            return Err(ConfigurationError::widget(format!(
                "Parameter {} uses a {widget} widget but has no range",
                self.label()
            )));
        }
        if let Some(ref default) = self.default {
            self.check_choice(default)?;
        }
        if let Some(Bound::Literal(ref value)) = self.current {
            self.check_choice(value)?;
        }
        Ok(())
    }

    /// Builds the read-only presentation snapshot, resolving the current value.
    pub fn describe(&mut self) -> ParamView {
        let value = self.resolve();
        ParamView::new(self, value)
    }

    fn check_choice(&self, value: &Value) -> Result<(), ConfigurationError> {
        if !self.ui.widget.requires_choices() || value.is_none() {
            return Ok(());
        }
        let Some(ref choices) = self.ui.choices else {
            return Ok(());
        };
        match value.as_str() {
            Some(s) if choices.iter().any(|c| c == s) => Ok(()),
            _ => Err(ConfigurationError::choice(&value.to_string(), choices)),
        }
    }

    fn label(&self) -> String {
        self.name
            .as_ref()
            .map_or_else(|| format!("<{}>", self.kind), |name| format!("'{name}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ValueSlot;
    use crate::errors::codes;

    #[test]
    fn test_default_is_materialized_once() {
        let mut param = Parameter::int().with_default(3).with_range(3.0, 10.0);

        assert_eq!(param.resolve(), Value::Int(3));
        assert!(matches!(param.current(), Some(Bound::Literal(Value::Int(3)))));
        assert_eq!(param.resolve(), Value::Int(3));
    }

    #[test]
    fn test_range_midpoint() {
        let mut param = Parameter::double().with_range(0.0, 100.0);
        assert_eq!(param.resolve(), Value::Double(50.0));

        let mut param = Parameter::int().with_range(3.0, 10.0);
        assert_eq!(param.resolve(), Value::Double(6.5));
    }

    #[test]
    fn test_explicit_value_wins() {
        let mut param = Parameter::double().with_default(1.0).with_value(7.0);
        assert_eq!(param.resolve(), Value::Double(7.0));
    }

    #[test]
    fn test_unresolvable_yields_none() {
        let mut param = Parameter::array();
        assert_eq!(param.resolve(), Value::None);
        assert!(param.current().is_none());
    }

    #[test]
    fn test_slot_binding_is_not_snapshotted() {
        let slot = ValueSlot::new();
        let mut param = Parameter::image().bound_to(SlotRef::new("load", 0, slot.clone()));

        assert_eq!(param.resolve(), Value::None);
        slot.set("frame-1");
        assert_eq!(param.resolve(), Value::from("frame-1"));
        slot.set("frame-2");
        assert_eq!(param.resolve(), Value::from("frame-2"));
        assert_eq!(param.slot_ref().unwrap().stage(), "load");
    }

    #[test]
    fn test_clearing_value_falls_back_to_default() {
        let mut param = Parameter::int().with_default(3);
        param.set_value(Value::None).unwrap();
        assert_eq!(param.resolve(), Value::Int(3));
        assert!(matches!(param.current(), Some(Bound::Literal(Value::Int(3)))));

        let mut param = Parameter::int().with_value(Value::None);
        assert_eq!(param.resolve(), Value::None);
    }

    #[test]
    fn test_none_default_defers_to_range() {
        let mut param = Parameter::double().with_default(Value::None).with_range(0.0, 10.0);
        assert_eq!(param.resolve(), Value::Double(5.0));
    }

    #[test]
    fn test_reset_restores_fallback() {
        let mut param = Parameter::boolean().with_default(false);
        param.set_value(true).unwrap();
        assert_eq!(param.resolve(), Value::Bool(true));

        param.reset();
        assert_eq!(param.resolve(), Value::Bool(false));
    }

    #[test]
    fn test_choice_enforced_on_write() {
        let mut param = Parameter::choice(["One", "Two", "Three"]).with_default("Two");
        assert!(param.validate().is_ok());

        param.set_value("Three").unwrap();
        let err = param.set_value("Four").unwrap_err();
        assert_eq!(err.code(), codes::PARAM_CHOICE);
        assert_eq!(param.resolve(), Value::from("Three"));

        param.set_value_unchecked("Four");
        assert_eq!(param.resolve(), Value::from("Four"));
    }

    #[test]
    fn test_widget_validation() {
        let combo = Parameter::new(ValueKind::Enum).with_widget(WidgetKind::Combo);
        assert_eq!(combo.validate().unwrap_err().code(), codes::PARAM_WIDGET);

        let slider = Parameter::double().named("threshold").with_widget(WidgetKind::Slider);
        let err = slider.validate().unwrap_err();
        assert_eq!(err.code(), codes::PARAM_WIDGET);
        assert!(err.message.contains("'threshold'"));

        let inverted = Parameter::slider(10.0, 0.0);
        assert_eq!(inverted.validate().unwrap_err().code(), codes::PARAM_RANGE);

        let bad_default = Parameter::choice(["a", "b"]).with_default("c");
        assert_eq!(bad_default.validate().unwrap_err().code(), codes::PARAM_CHOICE);
    }

    #[test]
    fn test_range_contains() {
        let range = Range::new(3.0, 10.0);
        assert!(range.contains(3.0));
        assert!(range.contains(10.0));
        assert!(!range.contains(10.5));
        assert!(Range::new(f64::NAN, 1.0).validate().is_err());
    }
}
