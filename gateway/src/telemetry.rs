//! Tracing subscriber setup.

use std::io::{self, IsTerminal};

use tracing_subscriber::{EnvFilter, fmt};
use weather_gateway_core::{Config, LogFormat};

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(String),
}

/// Filter directive in effect: `RUST_LOG` wins over the configured filter.
pub fn filter_directive(config: &Config, env_override: Option<String>) -> String {
    env_override
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| config.log_filter.clone())
}

/// Install the global subscriber described by `config`.
pub fn init(config: &Config) -> Result<(), TelemetryError> {
    let directive = filter_directive(config, std::env::var(EnvFilter::DEFAULT_ENV).ok());
    let filter =
        EnvFilter::try_new(&directive).map_err(|err| TelemetryError::Filter(err.to_string()))?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal());

    let installed = match config.log_format {
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    installed.map_err(|err| TelemetryError::Subscriber(err.to_string()))
}
