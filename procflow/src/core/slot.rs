//! Shared value cells and references to them.

use super::{Value, ValueKind};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// A mutable cell holding one stage result, addressable before it is populated.
///
/// Cloning a slot yields another handle to the same cell, so a downstream
/// parameter holding a clone observes every later `set`.
#[derive(Debug, Clone, Default)]
pub struct ValueSlot {
    inner: Arc<RwLock<Value>>,
}

impl ValueSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot holding a value.
    #[must_use]
    pub fn with_value(value: impl Into<Value>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value.into())),
        }
    }

    /// Returns the stored value.
    #[must_use]
    pub fn get(&self) -> Value {
        self.inner.read().clone()
    }

    /// Overwrites the stored value.
    pub fn set(&self, value: impl Into<Value>) {
        *self.inner.write() = value.into();
    }

    /// Resets the slot to `Value::None`.
    pub fn clear(&self) {
        *self.inner.write() = Value::None;
    }

    /// Returns true if the slot holds something other than `Value::None`.
    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.inner.read().is_none()
    }

    /// Returns the kind of the stored value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.inner.read().kind()
    }

    /// Returns true if both handles point at the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// A reference to output `index` of stage `stage`.
///
/// The stage/index pair feeds the dependency graph; the slot handle is
/// what resolution reads.
#[derive(Debug, Clone)]
pub struct SlotRef {
    stage: String,
    index: usize,
    slot: ValueSlot,
}

impl SlotRef {
    /// Creates a reference to a stage output slot.
    #[must_use]
    pub fn new(stage: impl Into<String>, index: usize, slot: ValueSlot) -> Self {
        Self {
            stage: stage.into(),
            index,
            slot,
        }
    }

    /// The producing stage.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// The output index within the producing stage.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The referenced slot.
    #[must_use]
    pub fn slot(&self) -> &ValueSlot {
        &self.slot
    }

    /// Reads the live value of the referenced slot.
    #[must_use]
    pub fn get(&self) -> Value {
        self.slot.get()
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.stage, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_slot_is_empty() {
        let slot = ValueSlot::new();
        assert!(!slot.is_set());
        assert_eq!(slot.get(), Value::None);
        assert_eq!(slot.kind(), ValueKind::None);
    }

    #[test]
    fn test_clones_share_the_cell() {
        let slot = ValueSlot::new();
        let alias = slot.clone();

        slot.set(42);
        assert_eq!(alias.get(), Value::Int(42));
        assert!(slot.ptr_eq(&alias));
        assert!(!slot.ptr_eq(&ValueSlot::new()));

        alias.clear();
        assert!(!slot.is_set());
    }

    #[test]
    fn test_slot_ref_reads_live_value() {
        let slot = ValueSlot::with_value("first");
        let slot_ref = SlotRef::new("load", 0, slot.clone());

        assert_eq!(slot_ref.get(), Value::from("first"));
        slot.set("second");
        assert_eq!(slot_ref.get(), Value::from("second"));
        assert_eq!(slot_ref.to_string(), "load[0]");
    }
}
