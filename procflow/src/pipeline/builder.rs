//! Pipeline builder with validation.

use super::{DependencyGraph, Pipeline};
use crate::config::EngineConfig;
use crate::errors::{ConfigurationError, PipelineError};
use crate::events::{EventSink, NoOpEventSink};
use crate::observability::{LoggingTracingEmitter, TracingEmitter};
use crate::params::Parameter;
use crate::stages::{Operation, Stage, StageHandle};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Builder for creating validated pipelines.
///
/// Each added stage is checked against the stages before it, so wiring
/// mistakes surface at the call that introduces them.
pub struct PipelineBuilder {
    name: String,
    stages: Vec<Stage>,
    config: EngineConfig,
    sink: Arc<dyn EventSink>,
    tracer: Arc<dyn TracingEmitter>,
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            config: EngineConfig::default(),
            sink: Arc::new(NoOpEventSink),
            tracer: Arc::new(LoggingTracingEmitter),
        }
    }

    /// Sets the engine configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the sink receiving lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the emitter receiving run and stage spans.
    #[must_use]
    pub fn with_tracing_emitter(mut self, tracer: Arc<dyn TracingEmitter>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Adds a stage running `operation` over `params`.
    ///
    /// Returns a handle whose outputs can be bound into later stages.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage is malformed, its name is taken, or
    /// its parameters reference a stage not added before it.
    pub fn stage(
        &mut self,
        name: impl Into<String>,
        operation: Arc<dyn Operation>,
        params: Vec<Parameter>,
    ) -> Result<StageHandle, PipelineError> {
        let stage = Stage::new(name, operation, params)?;
        self.add_stage(stage)
    }

    /// Adds an already constructed stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or the stage's parameters
    /// reference a stage not added before it. The builder is unchanged on
    /// error.
    pub fn add_stage(&mut self, stage: Stage) -> Result<StageHandle, PipelineError> {
        if self.stages.iter().any(|s| s.name() == stage.name()) {
            return Err(ConfigurationError::duplicate_stage(stage.name()).into());
        }

        self.stages.push(stage);
        if let Err(err) = DependencyGraph::build(&self.stages) {
            self.stages.pop();
            return Err(err);
        }

        let stage = &self.stages[self.stages.len() - 1];
        debug!(
            pipeline = %self.name,
            stage = stage.name(),
            operation = stage.operation().name(),
            "Stage added"
        );
        Ok(StageHandle::new(stage))
    }

    /// Returns the names of the stages added so far.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }

    /// Returns the number of stages added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if no stages were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns a `PIPELINE-EMPTY` configuration error if no stages were
    /// added.
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        if self.stages.is_empty() {
            return Err(ConfigurationError::empty_pipeline(&self.name).into());
        }
        Ok(Pipeline::new(self.name, self.stages)?
            .with_config(self.config)
            .with_event_sink(self.sink)
            .with_tracing_emitter(self.tracer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SlotRef, Value, ValueSlot};
    use crate::errors::codes;
    use crate::testing::{assert_config_error, ConstOperation, RecordingOperation};

    #[test]
    fn test_builder_chains_stages() {
        let mut builder = PipelineBuilder::new("chain");
        let a = builder
            .stage("a", Arc::new(ConstOperation::new(2)), vec![])
            .unwrap();
        builder
            .stage(
                "b",
                Arc::new(RecordingOperation::new("echo", 1)),
                vec![Parameter::int().bound_to(a.output(0).unwrap())],
            )
            .unwrap();

        assert_eq!(builder.stage_names(), vec!["a", "b"]);
        let mut pipeline = builder.build().unwrap();
        pipeline.run().unwrap();
        assert_eq!(pipeline.output("b", 0).unwrap().get(), Value::Int(2));
    }

    #[test]
    fn test_empty_builder_rejected() {
        let builder = PipelineBuilder::new("nothing");
        assert!(builder.is_empty());
        assert_config_error(&builder.build(), codes::PIPELINE_EMPTY);
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let mut builder = PipelineBuilder::new("dup");
        builder.stage("a", Arc::new(ConstOperation::new(1)), vec![]).unwrap();
        let result = builder.stage("a", Arc::new(ConstOperation::new(2)), vec![]);

        assert_config_error(&result, codes::STAGE_NAME_DUPLICATE);
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_unknown_reference_leaves_builder_unchanged() {
        let mut builder = PipelineBuilder::new("orphan");
        let dangling = SlotRef::new("ghost", 0, ValueSlot::new());
        let result = builder.stage(
            "b",
            Arc::new(RecordingOperation::new("echo", 1)),
            vec![Parameter::int().bound_to(dangling)],
        );

        assert_config_error(&result, codes::REF_UNKNOWN_STAGE);
        assert!(builder.is_empty());
    }

    #[test]
    fn test_arity_checked_on_add() {
        let mut builder = PipelineBuilder::new("arity");
        let result = builder.stage("a", Arc::new(RecordingOperation::new("echo", 2)), vec![]);
        assert_config_error(&result, codes::STAGE_ARITY);
        assert!(format!("{builder:?}").contains("arity"));
    }
}
