//! Strategies: ordered rules for resolving an intent to one element.
//!
//! # Design
//!
//! - **Ordered**: strategies are tried in the order given, most specific first
//! - **First match wins**: the first qualifying element is acted on, nothing else
//! - **Fallbacks are data**: a visible match, a hidden match with a visible
//!   ancestor, and direct navigation are all just entries in a [`StrategyList`]

use crate::effect::Effect;
use crate::pattern::TextPattern;
use crate::result::{ResoluteError, ResoluteResult};
use std::fmt;
use std::time::Duration;

/// Default timeout for resolving a strategy list (10 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval between resolution rounds (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Selector type for querying the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Render as a CSS selector string
    #[must_use]
    pub fn to_css(&self) -> String {
        match self {
            Self::Css(s) => s.clone(),
            Self::TestId(id) => format!("[data-testid={id:?}]"),
        }
    }

    /// Restrict every comma group to descendants of `scope`
    #[must_use]
    pub fn within(&self, scope: &Self) -> Self {
        let scope = scope.to_css();
        let own = self.to_css();
        let groups: Vec<String> = split_groups(&own)
            .into_iter()
            .map(|g| format!("{} {}", scope.trim(), g.trim()))
            .collect();
        Self::Css(groups.join(", "))
    }
}

/// Split a selector list on top-level commas
pub(crate) fn split_groups(css: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut depth = 0_u32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in css.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                groups.push(&css[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    groups.push(&css[start..]);
    groups
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

/// One candidate rule for resolving an intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Query elements and filter them by text and visibility
    Locate {
        /// Label used in reports
        label: String,
        /// Structural selector
        selector: Selector,
        /// Text filter; `None` accepts any text
        text: Option<TextPattern>,
        /// Whether a hidden match may be redirected to its nearest visible ancestor
        allow_hidden: bool,
    },
    /// Navigate straight to a URL; always qualifies
    Navigate {
        /// Label used in reports
        label: String,
        /// Destination
        url: String,
    },
}

impl Strategy {
    /// Locate by CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        let selector = selector.into();
        Self::Locate {
            label: selector.clone(),
            selector: Selector::Css(selector),
            text: None,
            allow_hidden: false,
        }
    }

    /// Locate by test id
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        let selector = Selector::test_id(id);
        Self::Locate {
            label: selector.to_css(),
            selector,
            text: None,
            allow_hidden: false,
        }
    }

    /// Navigate directly
    #[must_use]
    pub fn navigate(url: impl Into<String>) -> Self {
        let url = url.into();
        Self::Navigate {
            label: format!("navigate {url}"),
            url,
        }
    }

    /// Filter matches by text
    #[must_use]
    pub fn with_text(self, pattern: TextPattern) -> Self {
        match self {
            Self::Locate {
                label,
                selector,
                allow_hidden,
                ..
            } => Self::Locate {
                label: format!("{label} ~ {pattern}"),
                selector,
                text: Some(pattern),
                allow_hidden,
            },
            other => other,
        }
    }

    /// Permit a hidden match to be redirected to its nearest visible ancestor
    #[must_use]
    pub fn allow_hidden(self) -> Self {
        match self {
            Self::Locate {
                label,
                selector,
                text,
                ..
            } => Self::Locate {
                label,
                selector,
                text,
                allow_hidden: true,
            },
            other => other,
        }
    }

    /// Replace the report label
    #[must_use]
    pub fn labelled(self, new_label: impl Into<String>) -> Self {
        let new_label = new_label.into();
        match self {
            Self::Locate {
                selector,
                text,
                allow_hidden,
                ..
            } => Self::Locate {
                label: new_label,
                selector,
                text,
                allow_hidden,
            },
            Self::Navigate { url, .. } => Self::Navigate {
                label: new_label,
                url,
            },
        }
    }

    /// Report label
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Locate { label, .. } | Self::Navigate { label, .. } => label,
        }
    }
}

/// A non-empty, ordered list of strategies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyList(Vec<Strategy>);

impl StrategyList {
    /// Build from a vector
    ///
    /// # Errors
    ///
    /// Returns error if `strategies` is empty
    pub fn new(strategies: Vec<Strategy>) -> ResoluteResult<Self> {
        if strategies.is_empty() {
            return Err(ResoluteError::invalid("strategy list must not be empty"));
        }
        Ok(Self(strategies))
    }

    /// Start a list with its highest-priority strategy
    #[must_use]
    pub fn of(first: Strategy) -> Self {
        Self(vec![first])
    }

    /// Append a lower-priority fallback
    #[must_use]
    pub fn then(mut self, next: Strategy) -> Self {
        self.0.push(next);
        self
    }

    /// Strategies in priority order
    pub fn iter(&self) -> std::slice::Iter<'_, Strategy> {
        self.0.iter()
    }

    /// Number of strategies (never zero)
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Report labels in priority order
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.0.iter().map(Strategy::label).collect()
    }
}

impl From<Strategy> for StrategyList {
    fn from(strategy: Strategy) -> Self {
        Self::of(strategy)
    }
}

impl<'a> IntoIterator for &'a StrategyList {
    type Item = &'a Strategy;
    type IntoIter = std::slice::Iter<'a, Strategy>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Options for one `locate_and_act` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActOptions {
    /// Total time allowed for resolution
    pub timeout: Duration,
    /// Pause between resolution rounds
    pub poll_interval: Duration,
    /// Only rendered, laid-out elements qualify
    pub must_be_visible: bool,
    /// Act even when the target is obscured; enables hidden-ancestor redirection
    pub force_action: bool,
    /// Observable effect that must follow the action
    pub expect: Option<Effect>,
}

impl Default for ActOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            must_be_visible: true,
            force_action: false,
            expect: None,
        }
    }
}

impl ActOptions {
    /// Create default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the timeout in milliseconds
    #[must_use]
    pub const fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout = Duration::from_millis(ms);
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the visibility requirement
    #[must_use]
    pub const fn with_visible(mut self, visible: bool) -> Self {
        self.must_be_visible = visible;
        self
    }

    /// Set forced actions
    #[must_use]
    pub const fn with_force(mut self, force: bool) -> Self {
        self.force_action = force;
        self
    }

    /// Require an effect after the action
    #[must_use]
    pub fn expecting(mut self, effect: Effect) -> Self {
        self.expect = Some(effect);
        self
    }
}
