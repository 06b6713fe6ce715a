//! Log subscriber installation

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
#[must_use]
pub fn default_filter(config: &CliConfig) -> EnvFilter {
    EnvFilter::new(config.verbosity.log_filter())
}

/// Install the global subscriber; logs go to stderr
///
/// `RUST_LOG` takes precedence over the verbosity flags.
pub fn init_logging(config: &CliConfig) -> CliResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(config));
    let json = config.log_json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr)
    });
    let text = (!config.log_json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_ansi(config.color.should_color())
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .try_init()
        .map_err(|e| CliError::config(format!("logging already initialised: {e}")))
}
