//! Best-effort dismissal of consent banners, dialogs, and side sheets.
//!
//! A sweep never waits and never fails. It clicks at most once: groups and
//! their patterns are tried in order, and the first pattern with a visible
//! match gets a single forced click on that match. Driver errors are logged and
//! counted, nothing more.

use crate::driver::Driver;
use crate::engine::Engine;
use crate::pattern::TextPattern;
use crate::snapshot::ElementHandle;
use crate::strategy::Strategy;
use serde::Serialize;

/// Labelled run of patterns within a sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayGroup {
    /// Group label for reports
    pub label: String,
    /// Patterns in priority order
    pub patterns: Vec<Strategy>,
}

impl OverlayGroup {
    /// Create a group
    #[must_use]
    pub fn new(label: impl Into<String>, patterns: Vec<Strategy>) -> Self {
        Self {
            label: label.into(),
            patterns,
        }
    }
}

/// An ordered set of overlay groups; one sweep clicks at most one match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySweep {
    /// Groups, swept in order
    pub groups: Vec<OverlayGroup>,
}

impl Default for OverlaySweep {
    fn default() -> Self {
        let button = |label: &str| Strategy::css("button").with_text(TextPattern::word(label));
        Self {
            groups: vec![
                OverlayGroup::new(
                    "cookie consent",
                    vec![
                        Strategy::css("#sp-cc-accept"),
                        Strategy::css(r#"[data-action="a-cookie-consent"]"#),
                    ],
                ),
                OverlayGroup::new(
                    "dialogs",
                    vec![
                        Strategy::css(r#"button[aria-label="Close"]"#),
                        button("Close"),
                        button("Got it"),
                        button("OK"),
                        button("Not now"),
                        button("No thanks"),
                        button("Maybe later"),
                        Strategy::css("#attach-close_sideSheet-link"),
                        Strategy::css(".a-popover-header .a-button-close"),
                    ],
                ),
            ],
        }
    }
}

impl OverlaySweep {
    /// A sweep with no groups
    #[must_use]
    pub const fn empty() -> Self {
        Self { groups: Vec::new() }
    }

    /// Append a group
    #[must_use]
    pub fn with_group(mut self, group: OverlayGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Insert a group ahead of the others
    #[must_use]
    pub fn with_priority_group(mut self, group: OverlayGroup) -> Self {
        self.groups.insert(0, group);
        self
    }
}

/// What a sweep clicked
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Labels of the patterns that were clicked
    pub clicked: Vec<String>,
    /// Driver errors swallowed
    pub errors: u32,
}

impl SweepReport {
    /// Number of clicks performed
    #[must_use]
    pub fn clicks(&self) -> usize {
        self.clicked.len()
    }
}

impl<D: Driver> Engine<D> {
    /// Run one pass of `sweep` against the current page
    pub fn dismiss_overlays(&mut self, sweep: &OverlaySweep) -> SweepReport {
        let mut report = SweepReport::default();

        for group in &sweep.groups {
            for pattern in &group.patterns {
                let Strategy::Locate { selector, text, .. } = pattern else {
                    continue;
                };
                let found = match self.driver().query_all(selector) {
                    Ok(found) => found,
                    Err(e) => {
                        tracing::debug!(pattern = pattern.label(), error = %e, "overlay query failed");
                        report.errors += 1;
                        continue;
                    }
                };
                let hit = found
                    .iter()
                    .filter(|e| text.as_ref().map_or(true, |t| t.is_match(e.label())))
                    .find(|e| e.is_visible())
                    .map(|e: &ElementHandle| e.reference.clone());
                let Some(reference) = hit else {
                    continue;
                };
                match self.driver_mut().click(&reference) {
                    Ok(()) => {
                        tracing::info!(group = %group.label, pattern = pattern.label(), "dismissed overlay");
                        report.clicked.push(pattern.label().to_string());
                    }
                    Err(e) => {
                        tracing::debug!(pattern = pattern.label(), error = %e, "overlay click failed");
                        report.errors += 1;
                    }
                }
                return report;
            }
        }

        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::mock::{MockDriver, MockNode, Reaction};
    use crate::snapshot::ElementRef;

    fn engine(driver: MockDriver) -> Engine<MockDriver> {
        let (_, clock) = FakeClock::shared();
        Engine::with_clock(driver, clock)
    }

    #[test]
    fn test_nothing_to_dismiss_clicks_nothing() {
        let mut d = MockDriver::new("https://shop.test/");
        let body = d.root();
        let _ = d.append(body, MockNode::new("a").text("Book now"));
        let mut e = engine(d);
        let report = e.dismiss_overlays(&OverlaySweep::default());
        assert_eq!(report.clicks(), 0);
        assert_eq!(report.errors, 0);
        assert!(e.driver().clicked().is_empty());
    }

    #[test]
    fn test_sweep_clicks_at_most_once() {
        let mut d = MockDriver::new("https://shop.test/");
        let body = d.root();
        let accept = d.append(body, MockNode::new("input").id("sp-cc-accept"));
        let _ = d.append(body, MockNode::new("button").text("Not now"));
        let _ = d.append(body, MockNode::new("button").attr("aria-label", "Close"));
        d.on_click(accept, Reaction::Remove(accept));
        let mut e = engine(d);

        let report = e.dismiss_overlays(&OverlaySweep::default());
        assert_eq!(report.clicked, vec!["#sp-cc-accept"]);
        assert_eq!(e.driver().clicked(), vec![ElementRef::new(format!("m{accept}"))]);
    }

    #[test]
    fn test_next_sweep_takes_the_next_overlay() {
        let mut d = MockDriver::new("https://shop.test/");
        let body = d.root();
        let accept = d.append(body, MockNode::new("input").id("sp-cc-accept"));
        let close = d.append(body, MockNode::new("button").attr("aria-label", "Close"));
        d.on_click(accept, Reaction::Remove(accept));
        d.on_click(close, Reaction::Remove(close));
        let mut e = engine(d);

        assert_eq!(e.dismiss_overlays(&OverlaySweep::default()).clicked, vec!["#sp-cc-accept"]);
        assert_eq!(
            e.dismiss_overlays(&OverlaySweep::default()).clicked,
            vec![r#"button[aria-label="Close"]"#]
        );
        assert_eq!(e.dismiss_overlays(&OverlaySweep::default()).clicks(), 0);
    }

    #[test]
    fn test_failed_click_still_ends_the_sweep() {
        let mut d = MockDriver::new("https://shop.test/");
        let body = d.root();
        let accept = d.append(body, MockNode::new("input").id("sp-cc-accept"));
        let _ = d.append(body, MockNode::new("button").text("Got it"));
        d.fail_click(accept);
        let mut e = engine(d);

        let report = e.dismiss_overlays(&OverlaySweep::default());
        assert_eq!(report.clicks(), 0);
        assert_eq!(report.errors, 1);
        assert!(!e.driver().was_called("click:"));
    }

    #[test]
    fn test_priority_group_goes_first() {
        let mut d = MockDriver::new("https://shop.test/");
        let body = d.root();
        let _ = d.append(body, MockNode::new("button").attr("aria-label", "Close"));
        let _ = d.append(body, MockNode::new("input").id("attachSiNoCoverage"));
        let mut e = engine(d);
        let sweep = OverlaySweep::default().with_priority_group(OverlayGroup::new(
            "coverage upsell",
            vec![Strategy::css("#attachSiNoCoverage")],
        ));
        assert_eq!(e.dismiss_overlays(&sweep).clicked, vec!["#attachSiNoCoverage"]);
    }

    #[test]
    fn test_hidden_overlay_controls_are_ignored() {
        let mut d = MockDriver::new("https://shop.test/");
        let body = d.root();
        let sheet = d.append(body, MockNode::new("div").hidden());
        let _ = d.append(sheet, MockNode::new("a").id("attach-close_sideSheet-link"));
        let mut e = engine(d);
        assert_eq!(e.dismiss_overlays(&OverlaySweep::default()).clicks(), 0);
    }

    #[test]
    fn test_errors_are_swallowed() {
        let mut d = MockDriver::new("https://shop.test/");
        let body = d.root();
        let b = d.append(body, MockNode::new("button").text("Got it"));
        d.fail_selector("#sp-cc-accept");
        d.fail_click(b);
        let mut e = engine(d);
        let report = e.dismiss_overlays(&OverlaySweep::default());
        assert_eq!(report.clicks(), 0);
        assert_eq!(report.errors, 2);
    }

    #[test]
    fn test_sweep_does_not_wait() {
        let (fake, clock) = FakeClock::shared();
        let mut e = Engine::with_clock(MockDriver::new("https://shop.test/"), clock);
        let _ = e.dismiss_overlays(&OverlaySweep::default());
        assert_eq!(fake.sleep_count(), 0);
    }

    #[test]
    fn test_custom_group() {
        let mut d = MockDriver::new("https://shop.test/");
        let body = d.root();
        let _ = d.append(body, MockNode::new("button").text("Maybe later"));
        let mut e = engine(d);
        let sweep = OverlaySweep::empty().with_group(OverlayGroup::new(
            "prime upsell",
            vec![Strategy::css("button").with_text(TextPattern::word("Maybe later"))],
        ));
        assert_eq!(e.dismiss_overlays(&sweep).clicks(), 1);
    }
}
