//! Engine configuration and credentials.
//!
//! Configuration comes from an optional YAML file, then environment overrides.
//! Credentials are only ever read from the environment and never serialized
//! or logged.

use crate::driver::DriverConfig;
use crate::result::ResoluteError;
use crate::strategy::{ActOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::wait::WaitOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the command timeout
pub const ENV_TIMEOUT_MS: &str = "RESOLUTE_TIMEOUT_MS";
/// Environment variable overriding headless mode
pub const ENV_HEADLESS: &str = "RESOLUTE_HEADLESS";

/// Errors loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// Config path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// YAML did not parse
    #[error("invalid configuration: {0}")]
    Parse(String),
    /// An environment override had an unusable value
    #[error("invalid value {value:?} for {var}")]
    InvalidValue {
        /// Variable name
        var: String,
        /// Offending value
        value: String,
    },
}

impl From<ConfigError> for ResoluteError {
    fn from(e: ConfigError) -> Self {
        Self::Config {
            message: e.to_string(),
        }
    }
}

/// Names of the environment variables holding credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSource {
    /// Variable holding the account email
    pub email_var: String,
    /// Variable holding the account password
    pub password_var: String,
}

impl Default for CredentialSource {
    fn default() -> Self {
        Self {
            email_var: "RESOLUTE_EMAIL".to_string(),
            password_var: "RESOLUTE_PASSWORD".to_string(),
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default resolution timeout (ms)
    pub timeout_ms: u64,
    /// Default polling interval (ms)
    pub poll_interval_ms: u64,
    /// Browser launch options
    pub driver: DriverConfig,
    /// Where credentials come from
    pub credentials: CredentialSource,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            driver: DriverConfig::default(),
            credentials: CredentialSource::default(),
        }
    }
}

impl EngineConfig {
    /// Parse from YAML
    ///
    /// # Errors
    ///
    /// Returns error if the YAML is invalid
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml_ng::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from a YAML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Render as YAML
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml_ng::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides from the process environment
    ///
    /// # Errors
    ///
    /// Returns error if an override cannot be parsed
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from an arbitrary lookup
    ///
    /// # Errors
    ///
    /// Returns error if an override cannot be parsed
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: ENV_TIMEOUT_MS.to_string(),
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup(ENV_HEADLESS) {
            self.driver.headless = parse_bool(&value).ok_or_else(|| ConfigError::InvalidValue {
                var: ENV_HEADLESS.to_string(),
                value: value.clone(),
            })?;
        }
        Ok(())
    }

    /// Default options for engine actions
    #[must_use]
    pub fn act_options(&self) -> ActOptions {
        ActOptions::new()
            .with_timeout_ms(self.timeout_ms)
            .with_poll_interval(std::time::Duration::from_millis(self.poll_interval_ms))
    }

    /// Default options for polling waits
    #[must_use]
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(self.timeout_ms)
            .with_poll_interval(self.poll_interval_ms)
    }

    /// Read credentials from the process environment
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::from_lookup(&self.credentials, |var| std::env::var(var).ok())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Named secret values
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    values: BTreeMap<String, String>,
}

impl Credentials {
    /// Name of the email secret
    pub const EMAIL: &'static str = "email";
    /// Name of the password secret
    pub const PASSWORD: &'static str = "password";

    /// Empty credential set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect `email` and `password` through `lookup`; empty values are skipped
    #[must_use]
    pub fn from_lookup<F>(source: &CredentialSource, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut creds = Self::new();
        for (name, var) in [(Self::EMAIL, &source.email_var), (Self::PASSWORD, &source.password_var)] {
            if let Some(value) = lookup(var.as_str()).filter(|v| !v.is_empty()) {
                creds = creds.with(name, value);
            }
        }
        creds
    }

    /// Add a secret
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.values.insert(name.into(), value.into());
        self
    }

    /// Look up a secret
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Whether a secret is present
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.keys().map(|k| (k, "<redacted>")))
            .finish()
    }
}
