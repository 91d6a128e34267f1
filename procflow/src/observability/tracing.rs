//! Span attributes and timing for pipeline runs.
//!
//! Attribute sets flatten into string maps with dotted keys so they can be
//! attached to events or handed to an OpenTelemetry exporter unchanged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

/// Span attributes for a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSpanAttributes {
    /// Pipeline name.
    pub pipeline_name: String,
    /// Run ID.
    pub run_id: Option<String>,
    /// Number of stages.
    pub stage_count: usize,
    /// Duration in milliseconds.
    pub duration_ms: Option<f64>,
    /// Error message if the run failed.
    pub error: Option<String>,
}

impl PipelineSpanAttributes {
    /// Creates new pipeline span attributes.
    #[must_use]
    pub fn new(pipeline_name: impl Into<String>, stage_count: usize) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            stage_count,
            ..Default::default()
        }
    }

    /// Sets the run ID.
    #[must_use]
    pub fn with_run_id(mut self, id: impl Into<String>) -> Self {
        self.run_id = Some(id.into());
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the error.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Flattens into dotted attribute keys.
    #[must_use]
    pub fn to_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();
        attrs.insert("pipeline.name".to_string(), self.pipeline_name.clone());
        attrs.insert("pipeline.stage_count".to_string(), self.stage_count.to_string());
        if let Some(ref v) = self.run_id {
            attrs.insert("pipeline.run_id".to_string(), v.clone());
        }
        if let Some(v) = self.duration_ms {
            attrs.insert("pipeline.duration_ms".to_string(), v.to_string());
        }
        if let Some(ref v) = self.error {
            attrs.insert("pipeline.error".to_string(), v.clone());
        }
        attrs
    }
}

/// Span attributes for one stage execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageSpanAttributes {
    /// Stage name.
    pub stage_name: String,
    /// Operation name.
    pub operation: Option<String>,
    /// Number of positional arguments.
    pub arg_count: Option<usize>,
    /// Number of values written.
    pub output_count: Option<usize>,
    /// Duration in milliseconds.
    pub duration_ms: Option<f64>,
    /// Error message if failed.
    pub error: Option<String>,
}

impl StageSpanAttributes {
    /// Creates new stage span attributes.
    #[must_use]
    pub fn new(stage_name: impl Into<String>) -> Self {
        Self {
            stage_name: stage_name.into(),
            ..Default::default()
        }
    }

    /// Sets the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Sets the argument count.
    #[must_use]
    pub fn with_arg_count(mut self, count: usize) -> Self {
        self.arg_count = Some(count);
        self
    }

    /// Sets the output count.
    #[must_use]
    pub fn with_output_count(mut self, count: usize) -> Self {
        self.output_count = Some(count);
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the error.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Flattens into dotted attribute keys.
    #[must_use]
    pub fn to_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();
        attrs.insert("stage.name".to_string(), self.stage_name.clone());
        if let Some(ref v) = self.operation {
            attrs.insert("stage.operation".to_string(), v.clone());
        }
        if let Some(v) = self.arg_count {
            attrs.insert("stage.arg_count".to_string(), v.to_string());
        }
        if let Some(v) = self.output_count {
            attrs.insert("stage.output_count".to_string(), v.to_string());
        }
        if let Some(v) = self.duration_ms {
            attrs.insert("stage.duration_ms".to_string(), v.to_string());
        }
        if let Some(ref v) = self.error {
            attrs.insert("stage.error".to_string(), v.clone());
        }
        attrs
    }

    /// Converts to a JSON event payload.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        crate::utils::duration_ms(self.start.elapsed())
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span and returns the duration.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

/// Receives span boundaries for pipeline runs and stage executions.
///
/// Attributes are the flattened maps produced by
/// [`PipelineSpanAttributes::to_attributes`] and
/// [`StageSpanAttributes::to_attributes`].
#[cfg_attr(test, mockall::automock)]
pub trait TracingEmitter: Send + Sync {
    /// A span began.
    fn span_start(&self, name: &str, attributes: &HashMap<String, String>);

    /// A span finished successfully.
    fn span_end(&self, name: &str, duration_ms: f64, attributes: &HashMap<String, String>);

    /// A span finished with an error.
    fn span_error(&self, name: &str, error: &str, attributes: &HashMap<String, String>);
}

/// Discards every span.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpTracingEmitter;

impl TracingEmitter for NoOpTracingEmitter {
    fn span_start(&self, _name: &str, _attributes: &HashMap<String, String>) {}
    fn span_end(&self, _name: &str, _duration_ms: f64, _attributes: &HashMap<String, String>) {}
    fn span_error(&self, _name: &str, _error: &str, _attributes: &HashMap<String, String>) {}
}

/// Writes spans to `tracing`: starts at debug, ends at info, errors at error.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingTracingEmitter;

impl TracingEmitter for LoggingTracingEmitter {
    fn span_start(&self, name: &str, attributes: &HashMap<String, String>) {
        tracing::debug!(span_name = name, ?attributes, "Span started");
    }

    fn span_end(&self, name: &str, duration_ms: f64, attributes: &HashMap<String, String>) {
        tracing::info!(span_name = name, duration_ms, ?attributes, "Span ended");
    }

    fn span_error(&self, name: &str, error: &str, attributes: &HashMap<String, String>) {
        tracing::error!(span_name = name, error, ?attributes, "Span failed");
    }
}
