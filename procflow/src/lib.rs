//! # Procflow
//!
//! A deferred value-binding and execution engine for chains of
//! image-processing operations.
//!
//! Procflow provides:
//!
//! - **Deferred bindings**: a stage argument can name an output of an
//!   earlier stage before that output exists
//! - **Parameter descriptors**: defaults, ranges and choices resolved lazily,
//!   with a read-only view for presentation layers
//! - **Validated wiring**: unknown, self, forward and cyclic references are
//!   rejected before any operation runs
//! - **Event-driven observability**: lifecycle events and structured logs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use procflow::prelude::*;
//!
//! let mut builder = PipelineBuilder::new("edges");
//! let load = builder.stage("load", load_op, vec![Parameter::file().with_default("in.png")])?;
//! builder.stage(
//!     "gray",
//!     grayscale_op,
//!     vec![Parameter::image().bound_to(load.output(0)?)],
//! )?;
//!
//! let mut pipeline = builder.build()?;
//! let report = pipeline.run()?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod params;
pub mod pipeline;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{EngineConfig, LoggingConfig};
    pub use crate::core::{OutputArity, OutputSet, SlotRef, Value, ValueKind, ValueSlot};
    pub use crate::errors::{ConfigurationError, CycleDetectedError, PipelineError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::init_logging;
    pub use crate::params::{Bound, Parameter, ParamView, Range, StageView, UiHints, WidgetKind};
    pub use crate::pipeline::{DependencyGraph, Pipeline, PipelineBuilder, RunReport};
    pub use crate::stages::{FnOperation, Operation, Stage, StageHandle, StageRecord};
    pub use crate::utils::{generate_uuid, iso_timestamp, Timestamp};
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use std::sync::Arc;

    #[test]
    fn prelude_builds_and_runs() {
        let mut builder = PipelineBuilder::new("smoke");
        builder
            .stage(
                "double",
                Arc::new(FnOperation::new("double", 1, |args| {
                    Ok(vec![Value::Int(args[0].as_int().unwrap_or_default() * 2)])
                })),
                vec![Parameter::int().with_value(21)],
            )
            .unwrap();
        let mut pipeline = builder.build().unwrap();

        pipeline.run().unwrap();
        assert_eq!(pipeline.output("double", 0).unwrap().get(), Value::Int(42));
    }
}
