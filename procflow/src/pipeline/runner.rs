//! Pipeline execution.

use super::DependencyGraph;
use crate::config::EngineConfig;
use crate::core::{SlotRef, Value};
use crate::errors::{ConfigurationError, PipelineError};
use crate::events::{
    EventSink, NoOpEventSink, PIPELINE_COMPLETED, PIPELINE_FAILED, PIPELINE_STARTED,
    STAGE_COMPLETED, STAGE_FAILED, STAGE_STARTED,
};
use crate::observability::{LoggingTracingEmitter, PipelineSpanAttributes, SpanTimer, TracingEmitter};
use crate::params::{Parameter, StageView};
use crate::stages::{Stage, StageRecord};
use crate::utils::{generate_uuid, iso_timestamp, now_utc, Timestamp};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Summary of one successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Identifier of this run.
    pub run_id: Uuid,
    /// Pipeline name.
    pub pipeline: String,
    /// When the run began.
    pub started_at: Timestamp,
    /// Total run time in milliseconds.
    pub duration_ms: f64,
    /// One record per executed stage, in execution order.
    pub stages: Vec<StageRecord>,
}

impl RunReport {
    /// Returns the record for `stage`.
    #[must_use]
    pub fn stage(&self, stage: &str) -> Option<&StageRecord> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    /// Returns the executed stage names in order.
    #[must_use]
    pub fn executed(&self) -> Vec<&str> {
        self.stages.iter().map(|r| r.stage.as_str()).collect()
    }
}

/// An ordered list of stages executed as a unit.
///
/// Stages read their inputs from the output slots of earlier stages, so a
/// run is a single ordered pass: each stage resolves its parameters
/// against whatever its upstream stages just wrote.
pub struct Pipeline {
    name: String,
    stages: Vec<Stage>,
    config: EngineConfig,
    sink: Arc<dyn EventSink>,
    tracer: Arc<dyn TracingEmitter>,
}

const PIPELINE_SPAN: &str = "pipeline.run";
const STAGE_SPAN: &str = "stage.execute";

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stages)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline from stages in declaration order.
    ///
    /// An empty stage list is accepted here and rejected by [`Pipeline::run`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error if stage names repeat or the slot
    /// references between stages are invalid.
    pub fn new(name: impl Into<String>, stages: Vec<Stage>) -> Result<Self, PipelineError> {
        DependencyGraph::build(&stages)?;
        Ok(Self {
            name: name.into(),
            stages,
            config: EngineConfig::default(),
            sink: Arc::new(NoOpEventSink),
            tracer: Arc::new(LoggingTracingEmitter),
        })
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

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the pipeline has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns the stages in declaration order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Looks up a stage by name.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownStage`] if no stage has that name.
    pub fn stage(&self, name: &str) -> Result<&Stage, PipelineError> {
        self.stages
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| PipelineError::UnknownStage(name.to_string()))
    }

    /// Looks up a stage by name for editing.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownStage`] if no stage has that name.
    pub fn stage_mut(&mut self, name: &str) -> Result<&mut Stage, PipelineError> {
        self.stages
            .iter_mut()
            .find(|s| s.name() == name)
            .ok_or_else(|| PipelineError::UnknownStage(name.to_string()))
    }

    /// Returns a reference to output `index` of `stage`.
    ///
    /// # Errors
    ///
    /// Fails if the stage is unknown or the index is beyond its outputs.
    pub fn output(&self, stage: &str, index: usize) -> Result<SlotRef, PipelineError> {
        Ok(self.stage(stage)?.output(index)?)
    }

    /// Returns parameter `index` of `stage` for editing.
    ///
    /// # Errors
    ///
    /// Fails if the stage is unknown or has no parameter at `index`.
    pub fn param_mut(&mut self, stage: &str, index: usize) -> Result<&mut Parameter, PipelineError> {
        self.stage_mut(stage)?
            .param_mut(index)
            .ok_or_else(|| PipelineError::UnknownParameter {
                stage: stage.to_string(),
                index,
            })
    }

    /// Writes a literal value to a parameter, replacing any binding.
    ///
    /// Choice lists are enforced unless disabled in the configuration.
    ///
    /// # Errors
    ///
    /// Fails if the parameter does not exist, or with `PARAM-CHOICE` if the
    /// value is outside the parameter's choices.
    pub fn set_param(
        &mut self,
        stage: &str,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<(), PipelineError> {
        let validate = self.config.validate_choices;
        let param = self.param_mut(stage, index)?;
        if validate {
            param
                .set_value(value)
                .map_err(|e| e.with_stages(vec![stage.to_string()]))?;
        } else {
            param.set_value_unchecked(value);
        }
        Ok(())
    }

    /// Binds a parameter to another stage's output slot.
    ///
    /// The wiring is checked on the next [`Pipeline::validate`] or run.
    ///
    /// # Errors
    ///
    /// Fails if the parameter does not exist.
    pub fn bind_param(
        &mut self,
        stage: &str,
        index: usize,
        slot_ref: SlotRef,
    ) -> Result<(), PipelineError> {
        self.param_mut(stage, index)?.bind(slot_ref);
        Ok(())
    }

    /// Checks the wiring between stages.
    ///
    /// # Errors
    ///
    /// Returns the first reference problem found.
    pub fn validate(&self) -> Result<DependencyGraph, PipelineError> {
        DependencyGraph::build(&self.stages)
    }

    /// Returns stage names in execution order.
    ///
    /// # Errors
    ///
    /// Fails if the wiring between stages is invalid.
    pub fn execution_order(&self) -> Result<Vec<String>, PipelineError> {
        Ok(self
            .validate()?
            .execution_names()
            .into_iter()
            .map(String::from)
            .collect())
    }

    /// Builds presentation snapshots of every stage.
    pub fn views(&mut self) -> Vec<StageView> {
        self.stages.iter_mut().map(Stage::view).collect()
    }

    /// Executes every stage once, in dependency order.
    ///
    /// Each stage resolves its parameters at the moment it runs, so edits
    /// made between runs are picked up by the next run. The first failing
    /// stage aborts the run. Outputs written by stages that already ran
    /// are kept.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty pipeline or invalid
    /// wiring, before any operation is invoked, and otherwise the first
    /// stage failure.
    pub fn run(&mut self) -> Result<RunReport, PipelineError> {
        let run_id = generate_uuid();
        let attributes =
            PipelineSpanAttributes::new(&self.name, self.stages.len()).with_run_id(run_id.to_string());

        let order = match self.prepare() {
            Ok(order) => order,
            Err(err) => {
                warn!(pipeline = %self.name, run_id = %run_id, error = %err, "Pipeline rejected");
                self.sink.emit(
                    PIPELINE_FAILED,
                    Some(serde_json::json!({
                        "pipeline": &self.name,
                        "run_id": run_id.to_string(),
                        "code": err.code(),
                        "error": err.to_string(),
                    })),
                );
                return Err(err);
            }
        };

        let started_at = now_utc();
        let timer = SpanTimer::start(&self.name);
        info!(
            pipeline = %self.name,
            run_id = %run_id,
            stages = order.len(),
            "Pipeline started"
        );
        self.tracer.span_start(PIPELINE_SPAN, &attributes.to_attributes());
        self.sink.emit(
            PIPELINE_STARTED,
            Some(serde_json::json!({
                "pipeline": &self.name,
                "run_id": run_id.to_string(),
                "stages": order.len(),
                "timestamp": iso_timestamp(),
            })),
        );

        let mut records = Vec::with_capacity(order.len());
        for pos in order {
            match self.execute_at(pos) {
                Ok(record) => records.push(record),
                Err(err) => {
                    let attributes = attributes
                        .clone()
                        .with_duration_ms(timer.elapsed_ms())
                        .with_error(err.to_string());
                    self.tracer
                        .span_error(PIPELINE_SPAN, &err.to_string(), &attributes.to_attributes());
                    self.sink.emit(
                        PIPELINE_FAILED,
                        Some(serde_json::json!({
                            "pipeline": &self.name,
                            "run_id": run_id.to_string(),
                            "stage": self.stages[pos].name(),
                            "error": err.to_string(),
                        })),
                    );
                    return Err(err);
                }
            }
        }

        let duration_ms = timer.finish();
        self.tracer.span_end(
            PIPELINE_SPAN,
            duration_ms,
            &attributes.with_duration_ms(duration_ms).to_attributes(),
        );
        self.sink.emit(
            PIPELINE_COMPLETED,
            Some(serde_json::json!({
                "pipeline": &self.name,
                "run_id": run_id.to_string(),
                "duration_ms": duration_ms,
                "timestamp": iso_timestamp(),
            })),
        );

        Ok(RunReport {
            run_id,
            pipeline: self.name.clone(),
            started_at,
            duration_ms,
            stages: records,
        })
    }

    /// Executes a single stage against the current contents of its
    /// upstream slots.
    ///
    /// # Errors
    ///
    /// Fails if the stage is unknown, the wiring is invalid, a stage it
    /// reads from has never executed (`REF-UNEXECUTED`), or the stage's
    /// operation fails.
    pub fn run_stage(&mut self, name: &str) -> Result<StageRecord, PipelineError> {
        let graph = self.validate()?;
        let pos = self
            .stages
            .iter()
            .position(|s| s.name() == name)
            .ok_or_else(|| PipelineError::UnknownStage(name.to_string()))?;
        for upstream in graph.upstream_of(name) {
            let ran = self
                .stages
                .iter()
                .any(|s| s.name() == upstream && s.has_executed());
            if !ran {
                return Err(ConfigurationError::unexecuted_upstream(name, upstream).into());
            }
        }
        self.execute_at(pos)
    }

    fn prepare(&self) -> Result<Vec<usize>, PipelineError> {
        if self.stages.is_empty() {
            return Err(ConfigurationError::empty_pipeline(&self.name).into());
        }
        let graph = self.validate()?;
        debug!(
            pipeline = %self.name,
            order = ?graph.execution_names(),
            "Execution order resolved"
        );
        Ok(graph.execution_order().to_vec())
    }

    fn execute_at(&mut self, pos: usize) -> Result<StageRecord, PipelineError> {
        let emit = self.config.emit_stage_events;
        let stage = &mut self.stages[pos];

        self.tracer.span_start(STAGE_SPAN, &stage.span_attributes().to_attributes());
        if emit {
            self.sink.emit(
                STAGE_STARTED,
                Some(serde_json::json!({
                    "stage": stage.name(),
                    "operation": stage.operation().name(),
                })),
            );
        }

        match stage.execute() {
            Ok(record) => {
                let attributes = stage
                    .span_attributes()
                    .with_output_count(record.outputs)
                    .with_duration_ms(record.duration_ms);
                self.tracer
                    .span_end(STAGE_SPAN, record.duration_ms, &attributes.to_attributes());
                if emit {
                    self.sink.emit(
                        STAGE_COMPLETED,
                        Some(serde_json::json!({
                            "stage": &record.stage,
                            "outputs": record.outputs,
                            "duration_ms": record.duration_ms,
                        })),
                    );
                }
                Ok(record)
            }
            Err(err) => {
                let attributes = stage.span_attributes().with_error(err.to_string());
                self.tracer
                    .span_error(STAGE_SPAN, &err.to_string(), &attributes.to_attributes());
                if emit {
                    self.sink.emit(
                        STAGE_FAILED,
                        Some(serde_json::json!({
                            "stage": stage.name(),
                            "error": err.to_string(),
                        })),
                    );
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::codes;
    use crate::events::MockEventSink;
    use crate::observability::MockTracingEmitter;
    use crate::testing::{assert_config_error, ConstOperation, RecordingOperation};
    use mockall::predicate::eq;

    fn two_stage() -> Pipeline {
        let source = Stage::new("source", Arc::new(ConstOperation::new(5)), vec![]).unwrap();
        let echo = Stage::new(
            "echo",
            Arc::new(RecordingOperation::new("echo", 1)),
            vec![Parameter::int().bound_to(source.output(0).unwrap())],
        )
        .unwrap();
        Pipeline::new("two", vec![source, echo]).unwrap()
    }

    #[test]
    fn test_run_reports_every_stage() {
        let mut pipeline = two_stage();
        let report = pipeline.run().unwrap();

        assert_eq!(report.pipeline, "two");
        assert_eq!(report.executed(), vec!["source", "echo"]);
        assert_eq!(report.stage("echo").unwrap().outputs, 1);
        assert!(report.stage("missing").is_none());
        assert_eq!(pipeline.output("echo", 0).unwrap().get(), Value::Int(5));
    }

    #[test]
    fn test_empty_pipeline_rejected_on_run() {
        let mut pipeline = Pipeline::new("empty", vec![]).unwrap();
        assert!(pipeline.is_empty());
        assert_config_error(&pipeline.run(), codes::PIPELINE_EMPTY);
    }

    #[test]
    fn test_lookup_errors() {
        let mut pipeline = two_stage();
        assert!(matches!(
            pipeline.stage("nope"),
            Err(PipelineError::UnknownStage(name)) if name == "nope"
        ));
        assert!(matches!(
            pipeline.param_mut("echo", 3),
            Err(PipelineError::UnknownParameter { index: 3, .. })
        ));
        assert!(matches!(
            pipeline.run_stage("nope"),
            Err(PipelineError::UnknownStage(_))
        ));
    }

    #[test]
    fn test_set_param_respects_choice_validation() {
        let op = Arc::new(RecordingOperation::new("mode", 1));
        let stage = Stage::new("mode", op, vec![Parameter::choice(["fast", "slow"])]).unwrap();
        let mut pipeline = Pipeline::new("choices", vec![stage]).unwrap();

        assert_config_error(&pipeline.set_param("mode", 0, "medium"), codes::PARAM_CHOICE);
        pipeline.set_param("mode", 0, "slow").unwrap();

        let mut lenient = pipeline.with_config(EngineConfig::new().with_validate_choices(false));
        lenient.set_param("mode", 0, "medium").unwrap();
        lenient.run().unwrap();
        assert_eq!(lenient.output("mode", 0).unwrap().get(), Value::from("medium"));
    }

    #[test]
    fn test_run_stage_requires_upstream_to_have_run() {
        let mut pipeline = two_stage();
        let err = pipeline.run_stage("echo").unwrap_err();
        assert_eq!(err.code(), Some(codes::REF_UNEXECUTED));
        assert!(!pipeline.stage("echo").unwrap().has_executed());
        assert_eq!(pipeline.output("echo", 0).unwrap().get(), Value::None);

        pipeline.run_stage("source").unwrap();
        let record = pipeline.run_stage("echo").unwrap();
        assert_eq!(record.stage, "echo");
        assert_eq!(pipeline.output("echo", 0).unwrap().get(), Value::Int(5));
    }

    #[test]
    fn test_run_stage_after_full_run() {
        let mut pipeline = two_stage();
        pipeline.run().unwrap();
        pipeline.run_stage("echo").unwrap();
        assert_eq!(pipeline.stage("echo").unwrap().run_count(), 2);
    }

    #[test]
    fn test_events_emitted_to_mock_sink() {
        let mut sink = MockEventSink::new();
        sink.expect_emit()
            .with(eq(PIPELINE_STARTED), mockall::predicate::always())
            .times(1)
            .return_const(());
        sink.expect_emit()
            .with(eq(PIPELINE_COMPLETED), mockall::predicate::always())
            .times(1)
            .return_const(());

        let mut pipeline = two_stage()
            .with_config(EngineConfig::new().with_stage_events(false))
            .with_event_sink(Arc::new(sink));
        pipeline.run().unwrap();
    }

    #[test]
    fn test_spans_cover_run_and_each_stage() {
        let mut tracer = MockTracingEmitter::new();
        tracer.expect_span_start().times(3).return_const(());
        tracer.expect_span_end().times(3).return_const(());

        let mut pipeline = two_stage().with_tracing_emitter(Arc::new(tracer));
        pipeline.run().unwrap();
    }

    #[test]
    fn test_stage_failure_reports_span_error() {
        let failing = Stage::new(
            "broken",
            Arc::new(crate::testing::FailingOperation::new("broken", 0, "no input")),
            vec![],
        )
        .unwrap();
        let mut tracer = MockTracingEmitter::new();
        tracer.expect_span_start().times(2).return_const(());
        tracer
            .expect_span_error()
            .withf(|_, error, _| error.contains("no input"))
            .times(2)
            .return_const(());

        let mut pipeline = Pipeline::new("failing", vec![failing])
            .unwrap()
            .with_tracing_emitter(Arc::new(tracer));
        assert!(pipeline.run().is_err());
    }

    #[test]
    fn test_debug_lists_name() {
        let pipeline = two_stage();
        assert!(format!("{pipeline:?}").contains("two"));
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.stages()[0].name(), "source");
        assert!(pipeline.config().validate_choices);
    }
}
