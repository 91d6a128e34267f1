//! Tracing subscriber setup.

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs a global `tracing` subscriber configured by `config`.
///
/// Invalid filter directives fall back to `info`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(
    config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(true);
    if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}
