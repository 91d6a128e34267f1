//! A single processing step: operation, parameters and outputs.

use super::Operation;
use crate::core::{OutputArity, OutputSet, SlotRef, Value};
use crate::errors::{ConfigurationError, PipelineError};
use crate::observability::{SpanTimer, StageSpanAttributes};
use crate::params::{Parameter, StageView};
use crate::utils::validate_stage_name;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// What one successful stage execution did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecord {
    /// Stage name.
    pub stage: String,
    /// Operation name.
    pub operation: String,
    /// Number of values written to the output set.
    pub outputs: usize,
    /// Execution time in milliseconds.
    pub duration_ms: f64,
}

/// One operation bound to its parameters and output slots.
#[derive(Debug)]
pub struct Stage {
    name: String,
    operation: Arc<dyn Operation>,
    params: Vec<Parameter>,
    outputs: Arc<OutputSet>,
    run_count: usize,
}

impl Stage {
    /// Creates a stage.
    ///
    /// The output set is allocated from the operation's declared output
    /// arity, so downstream stages can reference outputs immediately.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the name is not an identifier, the
    /// parameter count differs from the operation's arity, or a parameter
    /// fails validation.
    pub fn new(
        name: impl Into<String>,
        operation: Arc<dyn Operation>,
        params: Vec<Parameter>,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        validate_stage_name(&name)?;

        if operation.arity() != params.len() {
            return Err(ConfigurationError::arity_mismatch(
                &name,
                operation.name(),
                operation.arity(),
                params.len(),
            ));
        }
        for (index, param) in params.iter().enumerate() {
            param.validate().map_err(|e| {
                e.with_stages(vec![name.clone()])
                    .with_context("param_index", index)
            })?;
        }

        let outputs = Arc::new(OutputSet::from_arity(operation.outputs()));
        Ok(Self {
            name,
            operation,
            params,
            outputs,
            run_count: 0,
        })
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the operation.
    #[must_use]
    pub fn operation(&self) -> &Arc<dyn Operation> {
        &self.operation
    }

    /// Returns the parameters in positional order.
    #[must_use]
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Returns the parameter at `index`.
    #[must_use]
    pub fn param(&self, index: usize) -> Option<&Parameter> {
        self.params.get(index)
    }

    /// Returns the parameter at `index` for editing.
    pub fn param_mut(&mut self, index: usize) -> Option<&mut Parameter> {
        self.params.get_mut(index)
    }

    /// Returns how many times the stage has executed successfully.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.run_count
    }

    /// Returns true once the stage has written its outputs at least once.
    #[must_use]
    pub fn has_executed(&self) -> bool {
        self.run_count > 0
    }

    /// Returns the output set.
    #[must_use]
    pub fn outputs(&self) -> &Arc<OutputSet> {
        &self.outputs
    }

    /// Returns a reference to output `index` for wiring into another stage.
    ///
    /// # Errors
    ///
    /// Returns an `OUTPUT-INDEX` configuration error if `index` is beyond a
    /// fixed output arity.
    pub fn output(&self, index: usize) -> Result<SlotRef, ConfigurationError> {
        output_ref(&self.name, &self.outputs, index)
    }

    /// Returns the slot references held by this stage's parameters.
    pub fn dependencies(&self) -> impl Iterator<Item = (usize, &SlotRef)> {
        self.params
            .iter()
            .enumerate()
            .filter_map(|(index, param)| param.slot_ref().map(|r| (index, r)))
    }

    /// Resolves every parameter, left to right.
    pub fn resolve_args(&mut self) -> Vec<Value> {
        let mut args = Vec::with_capacity(self.params.len());
        for (index, param) in self.params.iter_mut().enumerate() {
            let value = param.resolve();
            if !param.kind().admits(&value) {
                warn!(
                    stage = %self.name,
                    param_index = index,
                    declared = %param.kind(),
                    actual = %value.kind(),
                    "Resolved argument does not match its declared kind"
                );
            }
            if let (Some(range), Some(number)) = (param.range(), value.as_f64()) {
                if !range.contains(number) {
                    warn!(
                        stage = %self.name,
                        param_index = index,
                        value = number,
                        min = range.min,
                        max = range.max,
                        "Resolved argument is outside its range"
                    );
                }
            }
            args.push(value);
        }
        args
    }

    /// Executes the stage.
    ///
    /// Resolves the parameters, invokes the operation with them as
    /// positional arguments and writes the results to output slots
    /// `0..k`, where downstream parameters see them immediately.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Operation`] carrying the operation's own
    /// error, or [`PipelineError::OutputArity`] if it returned a different
    /// number of values than declared. Outputs are left untouched in
    /// either case.
    pub fn execute(&mut self) -> Result<StageRecord, PipelineError> {
        let timer = SpanTimer::start(&self.name);
        let args = self.resolve_args();
        debug!(
            stage = %self.name,
            operation = self.operation.name(),
            args = ?args.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Invoking operation"
        );

        let values = self
            .operation
            .invoke(&args)
            .map_err(|source| PipelineError::Operation {
                stage: self.name.clone(),
                operation: self.operation.name().to_string(),
                source,
            })?;

        if let OutputArity::Fixed(expected) = self.outputs.arity() {
            if values.len() != expected {
                return Err(PipelineError::OutputArity {
                    stage: self.name.clone(),
                    expected,
                    actual: values.len(),
                });
            }
        }

        let written = values.len();
        self.outputs.store(values);
        self.run_count += 1;

        let duration_ms = timer.finish();
        debug!(
            stage = %self.name,
            outputs = written,
            duration_ms,
            "Stage outputs written"
        );
        Ok(StageRecord {
            stage: self.name.clone(),
            operation: self.operation.name().to_string(),
            outputs: written,
            duration_ms,
        })
    }

    /// Returns span attributes describing this stage.
    #[must_use]
    pub fn span_attributes(&self) -> StageSpanAttributes {
        StageSpanAttributes::new(&self.name)
            .with_operation(self.operation.name())
            .with_arg_count(self.params.len())
    }

    /// Builds the presentation snapshot for this stage.
    pub fn view(&mut self) -> StageView {
        StageView {
            stage: self.name.clone(),
            operation: self.operation.name().to_string(),
            params: self.params.iter_mut().map(Parameter::describe).collect(),
            outputs: self.outputs.len(),
        }
    }
}

/// A lightweight handle for wiring to a stage's outputs after it has been
/// handed to a pipeline builder.
#[derive(Debug, Clone)]
pub struct StageHandle {
    name: String,
    outputs: Arc<OutputSet>,
}

impl StageHandle {
    /// Creates a handle for `stage`.
    #[must_use]
    pub fn new(stage: &Stage) -> Self {
        Self {
            name: stage.name.clone(),
            outputs: Arc::clone(&stage.outputs),
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a reference to output `index`.
    ///
    /// # Errors
    ///
    /// Returns an `OUTPUT-INDEX` configuration error if `index` is beyond a
    /// fixed output arity.
    pub fn output(&self, index: usize) -> Result<SlotRef, ConfigurationError> {
        output_ref(&self.name, &self.outputs, index)
    }
}

fn output_ref(
    stage: &str,
    outputs: &OutputSet,
    index: usize,
) -> Result<SlotRef, ConfigurationError> {
    let slot = outputs
        .at(index)
        .map_err(|e| e.with_stages(vec![stage.to_string()]))?;
    Ok(SlotRef::new(stage, index, slot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::codes;
    use crate::stages::FnOperation;

    fn add_op() -> Arc<dyn Operation> {
        Arc::new(FnOperation::new("add", 2, |args| {
            let a = args[0].as_f64().unwrap_or_default();
            let b = args[1].as_f64().unwrap_or_default();
            Ok(vec![Value::Double(a + b)])
        }))
    }

    #[test]
    fn test_stage_creation_checks_arity() {
        let err = Stage::new("sum", add_op(), vec![Parameter::double()]).unwrap_err();
        assert_eq!(err.code(), codes::STAGE_ARITY);
    }

    #[test]
    fn test_stage_creation_checks_name() {
        let params = vec![Parameter::double(), Parameter::double()];
        let err = Stage::new("bad name", add_op(), params).unwrap_err();
        assert_eq!(err.code(), codes::STAGE_NAME_INVALID);
    }

    #[test]
    fn test_stage_creation_validates_params() {
        let params = vec![Parameter::double(), Parameter::choice(Vec::<String>::new())];
        let err = Stage::new("sum", add_op(), params).unwrap_err();
        assert_eq!(err.code(), codes::PARAM_WIDGET);
        assert_eq!(err.stages, vec!["sum".to_string()]);
        assert_eq!(err.error_info.context.get("param_index"), Some(&"1".to_string()));
    }

    #[test]
    fn test_execute_writes_outputs() {
        let params = vec![
            Parameter::double().with_value(2.0),
            Parameter::double().with_range(0.0, 10.0),
        ];
        let mut stage = Stage::new("sum", add_op(), params).unwrap();
        let out = stage.output(0).unwrap();
        assert_eq!(out.get(), Value::None);

        let record = stage.execute().unwrap();
        assert_eq!(record.outputs, 1);
        assert_eq!(record.operation, "add");
        assert_eq!(out.get(), Value::Double(7.0));
        assert_eq!(stage.run_count(), 1);
    }

    #[test]
    fn test_debug_log_formats_arguments() {
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::fmt()
                .with_max_level(tracing::Level::DEBUG)
                .with_test_writer()
                .finish(),
        );
        let params = vec![Parameter::double().with_value(1.5), Parameter::double().with_value(2.5)];
        let mut stage = Stage::new("sum", add_op(), params).unwrap();

        stage.execute().unwrap();
        assert_eq!(stage.outputs().values(), vec![Value::Double(4.0)]);
    }

    #[test]
    fn test_output_bounds_follow_operation_arity() {
        let params = vec![Parameter::double(), Parameter::double()];
        let stage = Stage::new("sum", add_op(), params).unwrap();

        assert!(stage.output(0).is_ok());
        let err = stage.output(1).unwrap_err();
        assert_eq!(err.code(), codes::OUTPUT_INDEX);
        assert_eq!(err.stages, vec!["sum".to_string()]);
    }

    #[test]
    fn test_wrong_output_count_is_rejected() {
        let op = Arc::new(FnOperation::new("pair", 0, |_| Ok(vec![Value::Int(1)])).with_outputs(2));
        let mut stage = Stage::new("pair", op, vec![]).unwrap();

        match stage.execute() {
            Err(PipelineError::OutputArity { expected, actual, .. }) => {
                assert_eq!((expected, actual), (2, 1));
            }
            other => panic!("expected OutputArity, got {other:?}"),
        }
        assert_eq!(stage.outputs().values(), vec![Value::None, Value::None]);
    }

    #[test]
    fn test_dynamic_outputs_grow_on_write() {
        let op = Arc::new(
            FnOperation::new("split", 1, |args| {
                let text = args[0].as_str().unwrap_or_default();
                Ok(text.split(',').map(Value::from).collect())
            })
            .with_dynamic_outputs(),
        );
        let mut stage = Stage::new("split", op, vec![Parameter::string().with_value("a,b,c")]).unwrap();
        let third = StageHandle::new(&stage).output(2).unwrap();

        stage.execute().unwrap();
        assert_eq!(third.get(), Value::from("c"));
        assert_eq!(stage.outputs().len(), 3);
    }

    #[test]
    fn test_operation_error_is_wrapped() {
        let op = Arc::new(FnOperation::new("boom", 0, |_| anyhow::bail!("kaput")));
        let mut stage = Stage::new("boom", op, vec![]).unwrap();

        let err = stage.execute().unwrap_err();
        assert!(err.to_string().contains("Stage 'boom' failed"));
        assert!(!stage.has_executed());
        assert_eq!(err.operation_source().unwrap().to_string(), "kaput");
    }

    #[test]
    fn test_view_lists_params_in_order() {
        let params = vec![
            Parameter::double().named("a").with_value(1.0),
            Parameter::slider(0.0, 4.0).named("b"),
        ];
        let mut stage = Stage::new("sum", add_op(), params).unwrap();

        let view = stage.view();
        assert_eq!(view.operation, "add");
        assert_eq!(view.params.len(), 2);
        assert_eq!(view.params[1].value, Value::Double(2.0));
        assert_eq!(view.visible_params().count(), 1);
        assert_eq!(stage.span_attributes().arg_count, Some(2));
    }
}
