//! Ordered output slots of a stage.

use super::{Value, ValueSlot};
use crate::errors::ConfigurationError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Highest number of slots a dynamic output set will materialise.
pub const MAX_DYNAMIC_OUTPUTS: usize = 4096;

/// How many values an operation returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputArity {
    /// Exactly this many values on every call.
    Fixed(usize),
    /// A count only known once the operation has run.
    Dynamic,
}

impl Default for OutputArity {
    fn default() -> Self {
        Self::Fixed(1)
    }
}

/// The ordered group of slots produced by one stage.
///
/// With a fixed arity every slot is allocated up front and [`at`](Self::at)
/// is a bounds-checked accessor. With a dynamic arity, addressing an index
/// past the end materialises empty slots up to and including it, so a
/// downstream stage can be wired to an output that has never been written.
/// Either way a given index keeps the same slot for the set's lifetime.
#[derive(Debug)]
pub struct OutputSet {
    arity: OutputArity,
    slots: RwLock<Vec<ValueSlot>>,
}

impl Default for OutputSet {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSet {
    /// Creates an empty, growable output set.
    #[must_use]
    pub fn new() -> Self {
        Self::from_arity(OutputArity::Dynamic)
    }

    /// Creates an output set preallocated to `count` slots.
    #[must_use]
    pub fn with_arity(count: usize) -> Self {
        Self::from_arity(OutputArity::Fixed(count))
    }

    /// Creates an output set for the given arity.
    #[must_use]
    pub fn from_arity(arity: OutputArity) -> Self {
        let slots = match arity {
            OutputArity::Fixed(count) => (0..count).map(|_| ValueSlot::new()).collect(),
            OutputArity::Dynamic => Vec::new(),
        };
        Self {
            arity,
            slots: RwLock::new(slots),
        }
    }

    /// Returns the declared arity.
    #[must_use]
    pub fn arity(&self) -> OutputArity {
        self.arity
    }

    /// Returns the number of slots currently allocated.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Returns true if no slots are allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Returns the slot at `index`.
    ///
    /// # Errors
    ///
    /// Returns an `OUTPUT-INDEX` configuration error when the set has a
    /// fixed arity and `index` is beyond it, or when a dynamic set would
    /// have to grow past [`MAX_DYNAMIC_OUTPUTS`].
    pub fn at(&self, index: usize) -> Result<ValueSlot, ConfigurationError> {
        match self.arity {
            OutputArity::Fixed(count) => self
                .get(index)
                .ok_or_else(|| ConfigurationError::output_index(index, count)),
            OutputArity::Dynamic => {
                if index >= MAX_DYNAMIC_OUTPUTS {
                    return Err(ConfigurationError::output_limit(index, MAX_DYNAMIC_OUTPUTS));
                }
                let mut slots = self.slots.write();
                while slots.len() <= index {
                    slots.push(ValueSlot::new());
                }
                Ok(slots[index].clone())
            }
        }
    }

    /// Returns the slot at `index` without allocating.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<ValueSlot> {
        self.slots.read().get(index).cloned()
    }

    /// Writes `values` into slots `0..values.len()`.
    ///
    /// Dynamic sets grow as needed, and slots past the last written index
    /// are cleared so readers never see a previous run's leftovers.
    /// Callers check the count against a fixed arity beforehand.
    pub fn store(&self, values: Vec<Value>) {
        let mut slots = self.slots.write();
        let written = values.len();
        for (index, value) in values.into_iter().enumerate() {
            if index == slots.len() {
                slots.push(ValueSlot::new());
            }
            slots[index].set(value);
        }
        for slot in slots.iter().skip(written) {
            slot.clear();
        }
    }

    /// Returns a snapshot of every slot's value.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.slots.read().iter().map(ValueSlot::get).collect()
    }

    /// Returns handles to every allocated slot.
    #[must_use]
    pub fn slots(&self) -> Vec<ValueSlot> {
        self.slots.read().clone()
    }
}
