//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Environment variable overriding the log filter.
pub const LOG_FILTER_ENV: &str = "PROCFLOW_LOG";
/// Environment variable switching log output to JSON when set to `1`/`true`.
pub const LOG_JSON_ENV: &str = "PROCFLOW_LOG_JSON";

/// Configuration for the pipeline engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Reject writes outside a combo/radio parameter's choices.
    #[serde(default = "default_validate_choices")]
    pub validate_choices: bool,
    /// Emit `stage.*` events in addition to `pipeline.*` events.
    #[serde(default = "default_emit_stage_events")]
    pub emit_stage_events: bool,
    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_validate_choices() -> bool {
    true
}

fn default_emit_stage_events() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            validate_choices: default_validate_choices(),
            emit_stage_events: default_emit_stage_events(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with logging overridden from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            logging: LoggingConfig::from_env(),
            ..Self::default()
        }
    }

    /// Sets whether choice lists are enforced on writes.
    #[must_use]
    pub fn with_validate_choices(mut self, validate: bool) -> Self {
        self.validate_choices = validate;
        self
    }

    /// Sets whether per-stage events are emitted.
    #[must_use]
    pub fn with_stage_events(mut self, emit: bool) -> Self {
        self.emit_stage_events = emit;
        self
    }

    /// Sets the logging configuration.
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }
}

/// Configuration for the tracing subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive such as `info` or `procflow=debug`.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Reads `PROCFLOW_LOG` and `PROCFLOW_LOG_JSON`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let filter = lookup(LOG_FILTER_ENV)
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(default_filter);
        let json = lookup(LOG_JSON_ENV)
            .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
        Self { filter, json }
    }

    /// Sets the filter directive.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Switches JSON output on or off.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}
