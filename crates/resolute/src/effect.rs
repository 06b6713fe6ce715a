//! Observable effects that must follow an action.
//!
//! An action that "succeeds" at the driver level can still be dead: a click
//! swallowed by an overlay, a button that is not wired up yet. Effects let a
//! caller state what must change, so a dead action surfaces as
//! [`crate::Outcome::ActionFailed`] instead of passing silently.

use crate::driver::Driver;
use crate::pattern::TextPattern;
use crate::snapshot::ElementHandle;
use crate::stepper::read_number;
use crate::strategy::Selector;

/// A post-condition checked after an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// The numeric value of the first match must rise by exactly `by`
    CounterIncrement {
        /// Counter element
        selector: Selector,
        /// Expected increase
        by: i64,
    },
    /// The page URL must contain the fragment
    UrlContains(String),
    /// An element matching the selector (and text, if given) must exist
    Present {
        /// Element to look for
        selector: Selector,
        /// Optional text filter
        text: Option<TextPattern>,
    },
    /// No visible element may match the selector
    Gone {
        /// Element that must disappear
        selector: Selector,
    },
    /// Rendered page text must not match
    TextAbsent(TextPattern),
    /// The source attribute value must show up on at least one sink
    Propagated {
        /// Element carrying the value
        source: Selector,
        /// Attribute read from the source
        attribute: String,
        /// `(element, attribute)` pairs that may carry it; `value` reads the live field value
        sinks: Vec<(Selector, String)>,
    },
    /// Every effect must hold
    All(Vec<Effect>),
    /// At least one effect must hold
    Any(Vec<Effect>),
}

/// State captured before the action
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Baseline {
    /// Nothing to capture
    None,
    /// Counter value before the action
    Count(i64),
    /// One baseline per nested effect
    Many(Vec<Baseline>),
}

impl Effect {
    /// Counter incrementing by one
    #[must_use]
    pub fn counter_increment(selector: impl Into<String>) -> Self {
        Self::CounterIncrement {
            selector: Selector::css(selector),
            by: 1,
        }
    }

    /// Human-readable description for reports
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::CounterIncrement { selector, by } => format!("{selector} increases by {by}"),
            Self::UrlContains(fragment) => format!("url contains {fragment:?}"),
            Self::Present { selector, text } => match text {
                Some(t) => format!("{selector} with text {t} is present"),
                None => format!("{selector} is present"),
            },
            Self::Gone { selector } => format!("{selector} is gone"),
            Self::TextAbsent(pattern) => format!("page text does not match {pattern}"),
            Self::Propagated { source, attribute, .. } => format!("{source} [{attribute}] is propagated"),
            Self::All(effects) => join(effects, " and "),
            Self::Any(effects) => join(effects, " or "),
        }
    }

    /// Capture whatever the effect compares against
    pub(crate) fn capture<D: Driver + ?Sized>(&self, driver: &D) -> Baseline {
        match self {
            Self::CounterIncrement { selector, .. } => Baseline::Count(read_counter(driver, selector)),
            Self::All(effects) | Self::Any(effects) => {
                Baseline::Many(effects.iter().map(|e| e.capture(driver)).collect())
            }
            _ => Baseline::None,
        }
    }

    /// `None` when satisfied, otherwise what was observed instead
    pub(crate) fn check<D: Driver + ?Sized>(&self, driver: &D, baseline: &Baseline) -> Option<String> {
        match self {
            Self::CounterIncrement { selector, by } => {
                let before = match baseline {
                    Baseline::Count(n) => *n,
                    _ => 0,
                };
                let after = read_counter(driver, selector);
                match before.checked_add(*by) {
                    Some(expected) if after == expected => None,
                    Some(expected) => Some(format!("counter went from {before} to {after}, expected {expected}")),
                    None => Some(format!("counter at {before} cannot rise by {by}")),
                }
            }
            Self::UrlContains(fragment) => match driver.current_url() {
                Ok(url) if url.contains(fragment.as_str()) => None,
                Ok(url) => Some(format!("url is {url}")),
                Err(e) => Some(e.to_string()),
            },
            Self::Present { selector, text } => match driver.query_all(selector) {
                Ok(found) => {
                    let hit = found
                        .iter()
                        .any(|e| text.as_ref().map_or(true, |t| t.is_match(e.label())));
                    if hit {
                        None
                    } else {
                        Some(format!("{selector} not present"))
                    }
                }
                Err(e) => Some(e.to_string()),
            },
            Self::Gone { selector } => match driver.query_all(selector) {
                Ok(found) => {
                    let visible = found.iter().filter(|e| e.is_visible()).count();
                    if visible == 0 {
                        None
                    } else {
                        Some(format!("{visible} visible match(es) remain"))
                    }
                }
                Err(e) => Some(e.to_string()),
            },
            Self::TextAbsent(pattern) => match driver.page_text() {
                Ok(text) if pattern.is_match(&text) => Some(format!("page text matches {pattern}")),
                Ok(_) => None,
                Err(e) => Some(e.to_string()),
            },
            Self::Propagated {
                source,
                attribute,
                sinks,
            } => check_propagated(driver, source, attribute, sinks),
            Self::All(effects) => effects
                .iter()
                .enumerate()
                .find_map(|(i, e)| e.check(driver, nested(baseline, i))),
            Self::Any(effects) => {
                let mut observed = Vec::with_capacity(effects.len());
                for (i, e) in effects.iter().enumerate() {
                    match e.check(driver, nested(baseline, i)) {
                        None => return None,
                        Some(o) => observed.push(o),
                    }
                }
                Some(observed.join("; "))
            }
        }
    }
}

fn join(effects: &[Effect], sep: &str) -> String {
    let parts: Vec<String> = effects.iter().map(Effect::describe).collect();
    format!("({})", parts.join(sep))
}

static NO_BASELINE: Baseline = Baseline::None;

fn nested(baseline: &Baseline, index: usize) -> &Baseline {
    match baseline {
        Baseline::Many(all) => all.get(index).unwrap_or(&NO_BASELINE),
        _ => &NO_BASELINE,
    }
}

fn attribute_of<'a>(element: &'a ElementHandle, name: &str) -> Option<&'a str> {
    let live = if name == "value" { element.value.as_deref() } else { None };
    live.or_else(|| element.attribute(name))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn check_propagated<D: Driver + ?Sized>(
    driver: &D,
    source: &Selector,
    attribute: &str,
    sinks: &[(Selector, String)],
) -> Option<String> {
    let wanted = match driver.query_all(source) {
        Ok(found) => found.first().and_then(|e| attribute_of(e, attribute).map(str::to_string)),
        Err(e) => return Some(e.to_string()),
    };
    let Some(wanted) = wanted else {
        return Some(format!("{source} has no {attribute}"));
    };
    let carried = sinks.iter().any(|(selector, name)| {
        driver
            .query_all(selector)
            .ok()
            .and_then(|found| found.first().and_then(|e| attribute_of(e, name).map(|v| v == wanted)))
            .unwrap_or(false)
    });
    if carried {
        None
    } else {
        Some(format!("{wanted} not carried by any sink"))
    }
}

/// First match parsed as an integer; absent or unparsable reads as 0
pub(crate) fn read_counter<D: Driver + ?Sized>(driver: &D, selector: &Selector) -> i64 {
    driver
        .query_all(selector)
        .ok()
        .and_then(|found| found.first().map(read_number))
        .unwrap_or(0)
}
