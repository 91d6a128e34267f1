//! Lifecycle events emitted while a pipeline runs.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

#[cfg(test)]
pub use sink::MockEventSink;

/// A run began.
pub const PIPELINE_STARTED: &str = "pipeline.started";
/// Every stage completed.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// A stage failed or validation rejected the run.
pub const PIPELINE_FAILED: &str = "pipeline.failed";
/// A stage is about to execute.
pub const STAGE_STARTED: &str = "stage.started";
/// A stage wrote its outputs.
pub const STAGE_COMPLETED: &str = "stage.completed";
/// A stage's operation failed.
pub const STAGE_FAILED: &str = "stage.failed";
