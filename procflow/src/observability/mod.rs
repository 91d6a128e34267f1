//! Observability utilities.

mod logging;
mod tracing;

pub use self::logging::init_logging;
pub use self::tracing::{
    LoggingTracingEmitter, NoOpTracingEmitter, PipelineSpanAttributes, SpanTimer,
    StageSpanAttributes, TracingEmitter,
};

#[cfg(test)]
pub use self::tracing::MockTracingEmitter;
