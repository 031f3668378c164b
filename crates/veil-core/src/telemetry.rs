//! Process-wide tracing setup for hosts embedding the engine.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::CoreError;

/// Install a `fmt` subscriber configured from `config`.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a global
/// subscriber is already installed or the format is unknown.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), CoreError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match config.format.as_str() {
        "json" => builder.json().try_init(),
        "text" => builder.try_init(),
        other => {
            return Err(CoreError::Telemetry(format!(
                "unknown log format: {}",
                other
            )))
        }
    };

    result.map_err(|e| CoreError::Telemetry(e.to_string()))
}
