use tracing_subscriber::EnvFilter;

use crate::error::CliError;

/// Environment variable holding a filter directive; wins over the config.
pub const LOG_ENV: &str = "TERN_LOG";

/// Install the stderr subscriber. `TERN_LOG` overrides `default_filter`.
pub fn init_tracing(default_filter: &str) -> Result<(), CliError> {
    let directive = std::env::var(LOG_ENV).unwrap_or_else(|_| default_filter.to_string());
    let filter = parse_filter(&directive)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| CliError::LogFilter {
            filter: directive,
            reason: e.to_string(),
        })
}

fn parse_filter(directive: &str) -> Result<EnvFilter, CliError> {
    EnvFilter::try_new(directive).map_err(|e| CliError::LogFilter {
        filter: directive.to_string(),
        reason: e.to_string(),
    })
}
