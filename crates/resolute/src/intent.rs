//! Intents: what a step wants to happen, independent of how it is found.

use crate::config::Credentials;
use crate::pattern::TextPattern;
use crate::result::{ResoluteError, ResoluteResult};
use crate::strategy::Selector;

/// Value typed into a field
#[derive(Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Literal text
    Literal(String),
    /// Name of a secret resolved from [`Credentials`] at action time
    Secret(String),
}

impl FieldValue {
    /// Literal text
    #[must_use]
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    /// Secret reference
    #[must_use]
    pub fn secret(name: impl Into<String>) -> Self {
        Self::Secret(name.into())
    }

    /// Name of the referenced secret, if any
    #[must_use]
    pub fn secret_name(&self) -> Option<&str> {
        match self {
            Self::Secret(name) => Some(name),
            Self::Literal(_) => None,
        }
    }

    /// Produce the text to type
    ///
    /// # Errors
    ///
    /// Returns [`ResoluteError::PreconditionMissing`] for an absent secret
    pub fn resolve<'a>(&'a self, credentials: &'a Credentials) -> ResoluteResult<&'a str> {
        match self {
            Self::Literal(text) => Ok(text),
            Self::Secret(name) => credentials
                .get(name)
                .ok_or_else(|| ResoluteError::precondition(format!("secret `{name}`"))),
        }
    }
}

impl std::fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            Self::Secret(name) => write!(f, "Secret({name})"),
        }
    }
}

/// What one step wants to happen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Load a URL
    Navigate {
        /// Destination
        url: String,
    },
    /// Locate text without acting on it
    FindByText {
        /// Text to find
        pattern: TextPattern,
        /// Restrict matches to descendants of this selector
        scope: Option<Selector>,
    },
    /// Click the resolved element
    Click {
        /// Semantic label for diagnostics
        target: String,
    },
    /// Read an integer from the resolved element
    ReadNumber {
        /// Semantic label for diagnostics
        target: String,
    },
    /// Clear and type into the resolved field
    SetField {
        /// Semantic label for diagnostics
        target: String,
        /// Text to type
        value: FieldValue,
        /// Press Enter afterwards
        submit: bool,
    },
    /// Like `FindByText`, but a miss fails the step
    AssertTextPresent {
        /// Text that must be present
        pattern: TextPattern,
    },
}

impl Intent {
    /// Navigate to `url`
    #[must_use]
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::Navigate { url: url.into() }
    }

    /// Click `target`
    #[must_use]
    pub fn click(target: impl Into<String>) -> Self {
        Self::Click { target: target.into() }
    }

    /// Read a number from `target`
    #[must_use]
    pub fn read_number(target: impl Into<String>) -> Self {
        Self::ReadNumber { target: target.into() }
    }

    /// Type into `target`
    #[must_use]
    pub fn set_field(target: impl Into<String>, value: FieldValue) -> Self {
        Self::SetField {
            target: target.into(),
            value,
            submit: false,
        }
    }

    /// Find text anywhere
    #[must_use]
    pub fn find_text(pattern: TextPattern) -> Self {
        Self::FindByText { pattern, scope: None }
    }

    /// Assert text is present
    #[must_use]
    pub fn assert_text(pattern: TextPattern) -> Self {
        Self::AssertTextPresent { pattern }
    }

    /// Submit after typing (only affects `SetField`)
    #[must_use]
    pub fn submitting(self) -> Self {
        match self {
            Self::SetField { target, value, .. } => Self::SetField {
                target,
                value,
                submit: true,
            },
            other => other,
        }
    }

    /// Human-readable description; never contains secret values
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Navigate { url } => format!("navigate to {url}"),
            Self::FindByText { pattern, scope: None } => format!("find text {pattern}"),
            Self::FindByText {
                pattern,
                scope: Some(scope),
            } => format!("find text {pattern} within {scope}"),
            Self::Click { target } => format!("click {target:?}"),
            Self::ReadNumber { target } => format!("read number from {target:?}"),
            Self::SetField { target, .. } => format!("fill {target:?}"),
            Self::AssertTextPresent { pattern } => format!("assert text {pattern} is present"),
        }
    }

    /// Text filter implied by the intent itself
    #[must_use]
    pub fn text_filter(&self) -> Option<&TextPattern> {
        match self {
            Self::FindByText { pattern, .. } | Self::AssertTextPresent { pattern } => Some(pattern),
            _ => None,
        }
    }

    /// Selector every match must sit inside
    #[must_use]
    pub fn scope(&self) -> Option<&Selector> {
        match self {
            Self::FindByText { scope, .. } => scope.as_ref(),
            _ => None,
        }
    }

    /// Secret this intent needs, if any
    #[must_use]
    pub fn secret(&self) -> Option<&str> {
        match self {
            Self::SetField { value, .. } => value.secret_name(),
            _ => None,
        }
    }
}
