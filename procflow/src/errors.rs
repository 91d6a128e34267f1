//! Error types for the procflow engine.
//!
//! Configuration problems (empty pipelines, bad wiring, malformed
//! parameters) are reported as [`ConfigurationError`] carrying a
//! [`ContractErrorInfo`] code. Failures raised by operations are carried
//! through unmodified inside [`PipelineError::Operation`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for procflow operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The pipeline or one of its stages is misconfigured.
    #[error("{0}")]
    Config(#[from] ConfigurationError),

    /// Slot references between stages form a cycle.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// An operation signalled an error while a stage was executing.
    #[error("Stage '{stage}' failed in operation '{operation}': {source}")]
    Operation {
        /// The stage that was executing.
        stage: String,
        /// The operation name.
        operation: String,
        /// The error raised by the operation.
        #[source]
        source: anyhow::Error,
    },

    /// An operation returned a different number of values than it declared.
    #[error("Stage '{stage}' returned {actual} values but declares {expected} outputs")]
    OutputArity {
        /// The stage that was executing.
        stage: String,
        /// The declared output count.
        expected: usize,
        /// The number of values actually returned.
        actual: usize,
    },

    /// A stage lookup by name failed.
    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    /// A parameter lookup by position failed.
    #[error("Stage '{stage}' has no parameter at index {index}")]
    UnknownParameter {
        /// The stage name.
        stage: String,
        /// The requested parameter index.
        index: usize,
    },
}

impl PipelineError {
    /// Returns the contract code for configuration-type errors.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Config(err) => Some(err.code()),
            Self::CycleDetected(err) => Some(&err.error_info.code),
            _ => None,
        }
    }

    /// Returns true if this is a configuration error rather than a runtime failure.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_) | Self::CycleDetected(_))
    }

    /// Returns the original error raised by an operation, if any.
    #[must_use]
    pub fn operation_source(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Operation { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Metadata about a configuration error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "REF-FORWARD").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code));
        map.insert("summary".to_string(), serde_json::json!(self.summary));
        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::json!(hint));
        }
        if !self.context.is_empty() {
            map.insert("context".to_string(), serde_json::json!(self.context));
        }
        map
    }
}

/// Error raised when a pipeline, stage or parameter is misconfigured.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ConfigurationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

impl ConfigurationError {
    /// Creates a new configuration error with the given code.
    #[must_use]
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut error_info = ContractErrorInfo::new(code, message.clone());
        if let Some(hint) = ContractSuggestions::get(code) {
            error_info = error_info.with_fix_hint(hint);
        }
        Self {
            message,
            stages: Vec::new(),
            error_info,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Adds a context entry to the contract info.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.error_info = self.error_info.with_context_entry(key, value.to_string());
        self
    }

    /// Returns the contract code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.error_info.code
    }

    /// The pipeline has no stages.
    #[must_use]
    pub fn empty_pipeline(pipeline: &str) -> Self {
        Self::new(codes::PIPELINE_EMPTY, format!("Pipeline '{pipeline}' has no stages"))
    }

    /// A stage name is not a valid identifier.
    #[must_use]
    pub fn invalid_stage_name(name: &str) -> Self {
        Self::new(codes::STAGE_NAME_INVALID, format!("Invalid stage name '{name}'"))
            .with_stages(vec![name.to_string()])
    }

    /// Two stages share a name.
    #[must_use]
    pub fn duplicate_stage(name: &str) -> Self {
        Self::new(
            codes::STAGE_NAME_DUPLICATE,
            format!("Stage '{name}' is declared more than once"),
        )
        .with_stages(vec![name.to_string()])
    }

    /// The operation's positional arity does not match the parameter count.
    #[must_use]
    pub fn arity_mismatch(stage: &str, operation: &str, expected: usize, actual: usize) -> Self {
        Self::new(
            codes::STAGE_ARITY,
            format!(
                "Stage '{stage}': operation '{operation}' takes {expected} arguments but {actual} parameters were given"
            ),
        )
        .with_stages(vec![stage.to_string()])
        .with_context("expected", expected)
        .with_context("actual", actual)
    }

    /// A widget is missing the metadata it needs.
    #[must_use]
    pub fn widget(message: impl Into<String>) -> Self {
        Self::new(codes::PARAM_WIDGET, message)
    }

    /// A numeric range is malformed.
    #[must_use]
    pub fn range(min: f64, max: f64) -> Self {
        Self::new(
            codes::PARAM_RANGE,
            format!("Invalid range [{min}, {max}]: bounds must be finite and min <= max"),
        )
    }

    /// A value is not one of the allowed choices.
    #[must_use]
    pub fn choice(value: &str, choices: &[String]) -> Self {
        Self::new(
            codes::PARAM_CHOICE,
            format!("Value {value} is not one of the choices {choices:?}"),
        )
    }

    /// A slot reference names a stage that is not part of the pipeline.
    #[must_use]
    pub fn unknown_stage_ref(stage: &str, upstream: &str) -> Self {
        Self::new(
            codes::REF_UNKNOWN_STAGE,
            format!("Stage '{stage}' references an output of unknown stage '{upstream}'"),
        )
        .with_stages(vec![stage.to_string(), upstream.to_string()])
    }

    /// A stage references one of its own outputs.
    #[must_use]
    pub fn self_ref(stage: &str) -> Self {
        Self::new(
            codes::REF_SELF,
            format!("Stage '{stage}' references its own output"),
        )
        .with_stages(vec![stage.to_string()])
    }

    /// A stage references an output of a stage declared after it.
    #[must_use]
    pub fn forward_ref(stage: &str, upstream: &str) -> Self {
        Self::new(
            codes::REF_FORWARD,
            format!("Stage '{stage}' references an output of '{upstream}', which is declared later"),
        )
        .with_stages(vec![stage.to_string(), upstream.to_string()])
    }

    /// An output index is beyond the declared output arity.
    #[must_use]
    pub fn output_index(index: usize, arity: usize) -> Self {
        Self::new(
            codes::OUTPUT_INDEX,
            format!("Output index {index} is out of range for {arity} declared outputs"),
        )
        .with_context("index", index)
        .with_context("arity", arity)
    }

    /// A dynamic output index is past the growth limit.
    #[must_use]
    pub fn output_limit(index: usize, limit: usize) -> Self {
        Self::new(
            codes::OUTPUT_INDEX,
            format!("Output index {index} exceeds the limit of {limit} dynamic outputs"),
        )
        .with_context("index", index)
        .with_context("limit", limit)
    }

    /// A stage is run on its own before a stage it reads from has produced
    /// any output.
    #[must_use]
    pub fn unexecuted_upstream(stage: &str, upstream: &str) -> Self {
        Self::new(
            codes::REF_UNEXECUTED,
            format!("Stage '{stage}' reads outputs of '{upstream}', which has not run yet"),
        )
        .with_stages(vec![stage.to_string(), upstream.to_string()])
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::json!(self.message));
        map.insert("stages".to_string(), serde_json::json!(self.stages));
        let info: serde_json::Map<String, serde_json::Value> =
            self.error_info.to_dict().into_iter().collect();
        map.insert("error_info".to_string(), serde_json::Value::Object(info));
        map
    }
}

/// Error raised when a cycle is detected between stages.
#[derive(Debug, Clone, Error)]
#[error("Cycle detected in pipeline: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of stages forming the cycle.
    pub cycle_path: Vec<String>,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        let mut info = ContractErrorInfo::new(
            codes::REF_CYCLE,
            format!("Stage outputs form a cycle: {}", cycle_path.join(" -> ")),
        );
        if let Some(hint) = ContractSuggestions::get(codes::REF_CYCLE) {
            info = info.with_fix_hint(hint);
        }
        Self {
            cycle_path,
            error_info: info,
        }
    }
}

/// Contract codes carried by configuration errors.
pub mod codes {
    /// Pipeline has no stages.
    pub const PIPELINE_EMPTY: &str = "PIPELINE-EMPTY";
    /// Stage name is not an identifier.
    pub const STAGE_NAME_INVALID: &str = "STAGE-NAME-INVALID";
    /// Stage name used twice.
    pub const STAGE_NAME_DUPLICATE: &str = "STAGE-NAME-DUPLICATE";
    /// Operation arity differs from parameter count.
    pub const STAGE_ARITY: &str = "STAGE-ARITY";
    /// Widget metadata missing.
    pub const PARAM_WIDGET: &str = "PARAM-WIDGET";
    /// Malformed range.
    pub const PARAM_RANGE: &str = "PARAM-RANGE";
    /// Value outside the choice list.
    pub const PARAM_CHOICE: &str = "PARAM-CHOICE";
    /// Reference to a stage outside the pipeline.
    pub const REF_UNKNOWN_STAGE: &str = "REF-UNKNOWN-STAGE";
    /// Reference to the stage's own output.
    pub const REF_SELF: &str = "REF-SELF";
    /// Reference to a later-declared stage.
    pub const REF_FORWARD: &str = "REF-FORWARD";
    /// Cyclic references.
    pub const REF_CYCLE: &str = "REF-CYCLE";
    /// Reference to a stage that has not executed.
    pub const REF_UNEXECUTED: &str = "REF-UNEXECUTED";
    /// Output index beyond declared arity.
    pub const OUTPUT_INDEX: &str = "OUTPUT-INDEX";
}

/// Provides default suggestions for contract error codes.
pub struct ContractSuggestions;

impl ContractSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            codes::PIPELINE_EMPTY => Some("Add at least one stage to the pipeline before running it."),
            codes::STAGE_NAME_INVALID => Some(
                "Stage names must start with a letter or underscore and contain only \
                 letters, digits, '_', '-' or '.'.",
            ),
            codes::STAGE_NAME_DUPLICATE => Some("Give every stage in a pipeline a distinct name."),
            codes::STAGE_ARITY => {
                Some("Pass exactly one parameter per positional argument of the operation.")
            }
            codes::PARAM_WIDGET => {
                Some("Combo and radio widgets need choices; slider widgets need a range.")
            }
            codes::PARAM_RANGE => Some("Use finite bounds with min <= max."),
            codes::PARAM_CHOICE => Some("Pick one of the parameter's listed choices."),
            codes::REF_UNKNOWN_STAGE => Some(
                "Wire parameters to outputs of stages that belong to the same pipeline.",
            ),
            codes::REF_SELF | codes::REF_FORWARD => Some(
                "Declare the producing stage before any stage that reads its outputs.",
            ),
            codes::REF_CYCLE => Some("Remove one of the references in the cycle to break it."),
            codes::REF_UNEXECUTED => Some(
                "Run the upstream stages first, or run the whole pipeline.",
            ),
            codes::OUTPUT_INDEX => Some("Reference only outputs the operation declares."),
            _ => None,
        }
    }
}
