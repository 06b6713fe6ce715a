//! Result and error types for Resolute.
//!
//! The taxonomy mirrors how a step can go wrong against an uncontrolled UI:
//!
//! - [`ResoluteError::NotFound`]: expected absence, recoverable by a fallback
//! - [`ResoluteError::ActionFailed`]: element found, action had no observable effect
//! - [`ResoluteError::TimeoutExceeded`]: terminal for the current step
//! - [`ResoluteError::PreconditionMissing`]: fails fast before any UI interaction
//!
//! The engine itself returns [`crate::Outcome`] values for the first two; they
//! only become errors when a caller escalates them.

use thiserror::Error;

/// Result type for Resolute operations
pub type ResoluteResult<T> = Result<T, ResoluteError>;

/// Errors that can occur in Resolute
#[derive(Debug, Error)]
pub enum ResoluteError {
    /// No strategy produced a qualifying element before the timeout
    #[error("could not resolve intent `{intent}` after {strategies} strategies across {attempts} attempts")]
    NotFound {
        /// Human-readable intent description
        intent: String,
        /// Number of strategies in the exhausted list
        strategies: usize,
        /// Number of polling rounds performed
        attempts: u32,
    },

    /// Element was found but the action did not take effect
    #[error("action for intent `{intent}` failed: {reason}")]
    ActionFailed {
        /// Human-readable intent description
        intent: String,
        /// Why the action is considered failed
        reason: String,
    },

    /// A wait did not converge in time
    #[error("timed out after {ms}ms waiting for {waited_for}")]
    TimeoutExceeded {
        /// What was being waited for
        waited_for: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// A required input (credential, secret) is absent
    #[error("precondition missing: {what}")]
    PreconditionMissing {
        /// What is missing
        what: String,
    },

    /// A blocking assertion did not hold
    #[error("assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Numeric convergence stopped at its iteration bound
    #[error("`{target_label}` stuck at {reached} (wanted >= {target}) after {iterations} iterations")]
    ConvergenceNotReached {
        /// Semantic label of the converged field
        target_label: String,
        /// Wanted value
        target: i64,
        /// Last value read
        reached: i64,
        /// Iterations performed
        iterations: u32,
    },

    /// Invalid strategy or intent definition
    #[error("invalid definition: {message}")]
    InvalidDefinition {
        /// Error message
        message: String,
    },

    /// Invalid text pattern
    #[error("invalid text pattern `{pattern}`: {message}")]
    InvalidPattern {
        /// Offending pattern source
        pattern: String,
        /// Error message
        message: String,
    },

    /// The driver rejected or failed an operation
    #[error("driver error during {operation}: {message}")]
    Driver {
        /// Driver operation name
        operation: String,
        /// Error message
        message: String,
    },

    /// Element reference no longer resolves in the page
    #[error("stale element reference: {reference}")]
    StaleElement {
        /// Reference that went stale
        reference: String,
    },

    /// Browser launch error
    #[error("failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ResoluteError {
    /// Create a driver error
    #[must_use]
    pub fn driver(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Driver {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a precondition error
    #[must_use]
    pub fn precondition(what: impl Into<String>) -> Self {
        Self::PreconditionMissing { what: what.into() }
    }

    /// Create an invalid definition error
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            message: message.into(),
        }
    }

    /// Whether a fallback strategy may still recover from this error
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::ActionFailed { .. })
    }
}
