//! Text patterns matched against rendered element text.
//!
//! Patterns are case-insensitive regular expressions, matched anywhere in the
//! trimmed text unless anchored.

use crate::result::{ResoluteError, ResoluteResult};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A case-insensitive pattern over element text
#[derive(Clone)]
pub struct TextPattern {
    source: String,
    regex: Regex,
}

impl TextPattern {
    /// Compile a regular expression (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns error if the expression does not compile
    pub fn new(source: impl Into<String>) -> ResoluteResult<Self> {
        let source = source.into();
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|e| ResoluteError::InvalidPattern {
                pattern: source.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { source, regex })
    }

    /// Match text containing `literal` anywhere
    #[must_use]
    pub fn contains(literal: &str) -> Self {
        Self::literal(&regex::escape(literal))
    }

    /// Match text equal to `literal` (after trimming)
    #[must_use]
    pub fn exact(literal: &str) -> Self {
        Self::literal(&format!("^{}$", regex::escape(literal)))
    }

    /// Match `literal` as a whole word
    #[must_use]
    pub fn word(literal: &str) -> Self {
        Self::literal(&format!(r"\b{}\b", regex::escape(literal)))
    }

    /// Match any text, including empty
    #[must_use]
    pub fn any() -> Self {
        Self::literal("")
    }

    // Escaped input always compiles.
    fn literal(source: &str) -> Self {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .unwrap_or_else(|_| Regex::new("$^").expect("never-matching regex compiles"));
        Self {
            source: source.to_string(),
            regex,
        }
    }

    /// Whether the trimmed text matches
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text.trim())
    }

    /// The pattern source
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/i", self.source)
    }
}

impl fmt::Display for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/i", self.source)
    }
}

impl PartialEq for TextPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for TextPattern {}

impl Serialize for TextPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for TextPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Self::new(source).map_err(serde::de::Error::custom)
    }
}
