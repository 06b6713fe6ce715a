//! Driver - the browser capability seam.
//!
//! The engine never talks to a browser directly. Everything it needs from the
//! page goes through [`Driver`], so the same strategies run against the
//! in-memory [`crate::MockDriver`] in tests and against Chromium over CDP
//! (feature `browser`) for real.
//!
//! A driver represents one page session with a single writer: reads take
//! `&self`, anything that mutates the page takes `&mut self`.

use crate::result::ResoluteResult;
use crate::snapshot::{ElementHandle, ElementRef, Snapshot};
use crate::strategy::Selector;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Browser cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Domain; `None` means the current page's domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Path; `None` means `/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Cookie {
    /// Create a cookie for the current domain
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
        }
    }

    /// Scope the cookie to a domain
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// Browser launch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Browser locale (also sent as the preferred language)
    pub locale: String,
    /// User agent string
    pub user_agent: Option<String>,
    /// Timeout for navigation
    #[serde(with = "duration_ms")]
    pub navigation_timeout: Duration,
    /// Executable path override
    pub executable_path: Option<String>,
    /// Extra command-line arguments
    pub extra_args: Vec<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1366,
            viewport_height: 900,
            locale: "en-US".to_string(),
            user_agent: None,
            navigation_timeout: Duration::from_secs(30),
            executable_path: None,
            extra_args: Vec::new(),
        }
    }
}

impl DriverConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode
    #[must_use]
    pub const fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set locale
    #[must_use]
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Set user agent
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Add a command-line argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Command-line arguments pinning the browser to one language and
    /// disabling translation prompts and geolocation
    #[must_use]
    pub fn launch_args(&self) -> Vec<String> {
        let primary = self.locale.split('-').next().unwrap_or("en");
        let mut args = vec![
            format!("--lang={}", self.locale),
            format!("--accept-lang={},{primary}", self.locale),
            "--disable-features=Translate,TranslateUI".to_string(),
            "--disable-geolocation".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Page capabilities the engine consumes
pub trait Driver {
    /// Navigate to a URL and wait for the load
    ///
    /// # Errors
    ///
    /// Returns error if navigation fails
    fn navigate(&mut self, url: &str) -> ResoluteResult<()>;

    /// Current page URL
    ///
    /// # Errors
    ///
    /// Returns error if the page is gone
    fn current_url(&self) -> ResoluteResult<String>;

    /// All elements matching the selector, in document order, hidden ones included
    ///
    /// # Errors
    ///
    /// Returns error if the selector is invalid or the query fails
    fn query_all(&self, selector: &Selector) -> ResoluteResult<Vec<ElementHandle>>;

    /// Ancestors of an element, nearest first
    ///
    /// # Errors
    ///
    /// Returns error if the element is stale
    fn ancestors(&self, element: &ElementRef) -> ResoluteResult<Vec<ElementHandle>>;

    /// Click an element
    ///
    /// # Errors
    ///
    /// Returns error if the element is stale or the click fails
    fn click(&mut self, element: &ElementRef) -> ResoluteResult<()>;

    /// Clear a field and type into it, optionally submitting with Enter
    ///
    /// # Errors
    ///
    /// Returns error if the element is stale or not editable
    fn type_text(&mut self, element: &ElementRef, text: &str, submit: bool) -> ResoluteResult<()>;

    /// Scroll an element into the viewport
    ///
    /// # Errors
    ///
    /// Returns error if the element is stale
    fn scroll_into_view(&mut self, element: &ElementRef) -> ResoluteResult<()>;

    /// Rendered text of the whole page
    ///
    /// # Errors
    ///
    /// Returns error if the page is gone
    fn page_text(&self) -> ResoluteResult<String>;

    /// Set a cookie
    ///
    /// # Errors
    ///
    /// Returns error if the browser rejects the cookie
    fn set_cookie(&mut self, cookie: &Cookie) -> ResoluteResult<()>;

    /// Reload the current page
    ///
    /// # Errors
    ///
    /// Returns error if the reload fails
    fn reload(&mut self) -> ResoluteResult<()>;

    /// Query and package the result as a [`Snapshot`]
    ///
    /// # Errors
    ///
    /// Returns error if the query fails
    fn snapshot(&self, selector: &Selector, taken_at_ms: u64) -> ResoluteResult<Snapshot> {
        Ok(Snapshot {
            url: self.current_url()?,
            elements: self.query_all(selector)?,
            taken_at_ms,
        })
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
