//! Stages and the operations they invoke.
//!
//! A [`Stage`] is the unit of execution: it owns an [`Operation`], one
//! [`Parameter`](crate::params::Parameter) per positional argument, and an
//! [`OutputSet`](crate::core::OutputSet) that later stages read from.

mod operation;
mod stage;

pub use operation::{FnOperation, Operation};
pub use stage::{Stage, StageHandle, StageRecord};
