//! Pipeline construction, validation and execution.
//!
//! This module provides:
//! - [`DependencyGraph`]: reference validation and execution ordering
//! - [`PipelineBuilder`]: incremental, validated construction
//! - [`Pipeline`]: sequential execution with lifecycle events

mod builder;
mod graph;
mod runner;


pub use builder::PipelineBuilder;
pub use graph::DependencyGraph;
pub use runner::{Pipeline, RunReport};
