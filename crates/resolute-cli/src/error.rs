//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Playbook could not be loaded or validated
    #[error("Playbook {path}: {message}")]
    Playbook {
        /// Playbook path
        path: String,
        /// Error message
        message: String,
    },

    /// A scenario ran and failed
    #[error("Scenario `{scenario}` failed: {message}")]
    ScenarioFailed {
        /// Scenario name
        scenario: String,
        /// First failing step
        message: String,
    },

    /// Running requires the browser feature
    #[error("Browser support not enabled. Rebuild with --features browser")]
    BrowserUnavailable,

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resolute library error
    #[error("Resolute error: {0}")]
    Resolute(#[from] resolute::ResoluteError),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a playbook error
    #[must_use]
    pub fn playbook(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::Playbook {
            path: path.display().to_string(),
            message: message.into(),
        }
    }
}

impl From<resolute::ConfigError> for CliError {
    fn from(e: resolute::ConfigError) -> Self {
        Self::config(e.to_string())
    }
}
