//! Core value model for procflow.
//!
//! This module contains the leaf types the engine is built from:
//! - Dynamically typed values and their kinds
//! - Shared value slots and references to them
//! - Per-stage output sets

mod outputs;
mod slot;
mod value;

pub use outputs::{OutputArity, OutputSet};
pub use slot::{SlotRef, ValueSlot};
pub use value::{Value, ValueKind};
