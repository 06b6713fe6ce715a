//! The locator/action engine.
//!
//! # Resolution
//!
//! One call to [`Engine::locate_and_act`] runs polling rounds until a strategy
//! qualifies or the timeout elapses. Within a round strategies are evaluated in
//! declared order:
//!
//! 1. query the selector and keep matches whose text fits the filter
//! 2. prefer the first visible match
//! 3. under `force_action`, redirect a hidden match of an `allow_hidden`
//!    strategy to its nearest visible ancestor
//! 4. act on the first qualifying element and stop
//!
//! A hidden raw match is never acted on while `force_action` is set. At most
//! one element is acted on per call.

use crate::clock::{SharedClock, SystemClock};
use crate::config::Credentials;
use crate::driver::Driver;
use crate::effect::{Baseline, Effect};
use crate::intent::Intent;
use crate::result::{ResoluteError, ResoluteResult};
use crate::snapshot::{ElementHandle, ElementRef};
use crate::stepper::read_number;
use crate::strategy::{ActOptions, Strategy, StrategyList};
use crate::wait::{self, WaitOptions, WaitResult};
use serde::Serialize;
use std::time::Duration;

/// What the action was performed on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Target {
    /// A page element
    Element(ElementRef),
    /// A direct navigation
    Page(String),
}

/// How an intent was resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Acted-on target
    pub target: Target,
    /// Position of the winning strategy in the list
    pub strategy_index: usize,
    /// Label of the winning strategy
    pub strategy_label: String,
    /// Whether the target is the visible ancestor of a hidden match
    pub via_ancestor: bool,
    /// Polling rounds used
    pub attempts: u32,
    /// Time spent resolving and acting (ms)
    pub elapsed_ms: u64,
    /// Number read by a `ReadNumber` intent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading: Option<i64>,
}

/// Why nothing was acted on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exhaustion {
    /// Intent description
    pub intent: String,
    /// Number of strategies tried
    pub strategies: usize,
    /// Strategy labels, in order
    pub labels: Vec<String>,
    /// Polling rounds performed
    pub attempts: u32,
    /// Time spent (ms)
    pub elapsed_ms: u64,
}

impl Exhaustion {
    /// Convert into the matching error
    #[must_use]
    pub fn into_error(self) -> ResoluteError {
        ResoluteError::NotFound {
            intent: self.intent,
            strategies: self.strategies,
            attempts: self.attempts,
        }
    }
}

/// Result of one `locate_and_act` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// An element (or page) was resolved and the action took effect
    Succeeded(Resolution),
    /// No strategy qualified before the timeout
    NotFound(Exhaustion),
    /// A target was resolved but the action failed or had no effect
    ActionFailed {
        /// Intent description
        intent: String,
        /// The resolution that was acted on
        resolution: Resolution,
        /// What went wrong
        reason: String,
    },
}

impl Outcome {
    /// Whether the action succeeded
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Resolution, if a target was found
    #[must_use]
    pub const fn resolution(&self) -> Option<&Resolution> {
        match self {
            Self::Succeeded(r) | Self::ActionFailed { resolution: r, .. } => Some(r),
            Self::NotFound(_) => None,
        }
    }

    /// Number read by a successful `ReadNumber`
    #[must_use]
    pub fn reading(&self) -> Option<i64> {
        match self {
            Self::Succeeded(r) => r.reading,
            _ => None,
        }
    }

    /// Escalate failures to errors
    ///
    /// # Errors
    ///
    /// Returns [`ResoluteError::NotFound`] or [`ResoluteError::ActionFailed`]
    pub fn into_result(self) -> ResoluteResult<Resolution> {
        match self {
            Self::Succeeded(r) => Ok(r),
            Self::NotFound(e) => Err(e.into_error()),
            Self::ActionFailed { intent, reason, .. } => Err(ResoluteError::ActionFailed { intent, reason }),
        }
    }
}

struct Candidate {
    target: Target,
    element: Option<ElementHandle>,
    via_ancestor: bool,
}

/// Resolves intents against a live page
#[derive(Debug)]
pub struct Engine<D: Driver> {
    driver: D,
    clock: SharedClock,
    credentials: Credentials,
}

impl<D: Driver> Engine<D> {
    /// Create an engine on the wall clock
    #[must_use]
    pub fn new(driver: D) -> Self {
        Self::with_clock(driver, SystemClock::shared())
    }

    /// Create an engine on an injected clock
    #[must_use]
    pub fn with_clock(driver: D, clock: SharedClock) -> Self {
        Self {
            driver,
            clock,
            credentials: Credentials::new(),
        }
    }

    /// Attach credentials for secret field values
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// The driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The driver, mutably
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Give the driver back
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// The clock
    #[must_use]
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Attached credentials
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn now(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Poll `probe` against the driver until it yields a value
    ///
    /// # Errors
    ///
    /// Returns [`ResoluteError::TimeoutExceeded`] if the probe never yields
    pub fn poll_until<T, F>(&self, options: &WaitOptions, mut probe: F) -> ResoluteResult<WaitResult<T>>
    where
        F: FnMut(&D) -> ResoluteResult<Option<T>>,
    {
        let driver = &self.driver;
        wait::poll_until(self.clock.as_ref(), options, || probe(driver))
    }

    /// Wait for `effect` to hold without acting
    ///
    /// # Errors
    ///
    /// Returns [`ResoluteError::AssertionFailed`] if it does not hold within the timeout
    pub fn verify(&self, effect: &Effect, options: &ActOptions) -> ResoluteResult<()> {
        let baseline = effect.capture(&self.driver);
        self.await_effect(effect, baseline, options)
            .map_err(|message| ResoluteError::AssertionFailed { message })
    }

    /// Whether `effect` holds right now
    #[must_use]
    pub fn holds(&self, effect: &Effect) -> bool {
        effect.check(&self.driver, &effect.capture(&self.driver)).is_none()
    }

    /// Resolve `intent` through `strategies` and perform its action
    ///
    /// Returns an [`Outcome`] for expected failures; only preconditions
    /// (a missing secret) are errors.
    ///
    /// # Errors
    ///
    /// Returns [`ResoluteError::PreconditionMissing`] if a secret is absent
    pub fn locate_and_act(
        &mut self,
        intent: &Intent,
        strategies: &StrategyList,
        options: &ActOptions,
    ) -> ResoluteResult<Outcome> {
        let description = intent.describe();
        let field_text = match intent {
            Intent::SetField { value, .. } => Some(value.resolve(&self.credentials)?.to_string()),
            _ => None,
        };
        let start = self.now();

        if let Intent::Navigate { url } = intent {
            let resolution = Resolution {
                target: Target::Page(url.clone()),
                strategy_index: 0,
                strategy_label: format!("navigate {url}"),
                via_ancestor: false,
                attempts: 1,
                elapsed_ms: 0,
                reading: None,
            };
            return Ok(self.finish(&description, resolution, None, options, start, |engine| {
                engine.driver.navigate(url)
            }));
        }

        let mut attempts = 0_u32;
        loop {
            attempts = attempts.saturating_add(1);
            for (index, strategy) in strategies.iter().enumerate() {
                let Some(candidate) = self.qualify(intent, strategy, options) else {
                    continue;
                };
                tracing::debug!(
                    intent = %description,
                    strategy = strategy.label(),
                    via_ancestor = candidate.via_ancestor,
                    attempts,
                    "strategy qualified"
                );
                let reading = match (intent, &candidate.element) {
                    (Intent::ReadNumber { .. }, Some(element)) => Some(read_number(element)),
                    _ => None,
                };
                let resolution = Resolution {
                    target: candidate.target.clone(),
                    strategy_index: index,
                    strategy_label: strategy.label().to_string(),
                    via_ancestor: candidate.via_ancestor,
                    attempts,
                    elapsed_ms: 0,
                    reading,
                };
                let baseline = options.expect.as_ref().map(|e| e.capture(&self.driver));
                let outcome = self.finish(
                    &description,
                    resolution,
                    baseline,
                    options,
                    start,
                    |engine| engine.perform(intent, &candidate, field_text.as_deref()),
                );
                return Ok(outcome);
            }

            let elapsed = self.now().saturating_sub(start);
            if elapsed >= options.timeout {
                break;
            }
            let step = options.poll_interval.max(Duration::from_millis(1));
            self.clock.sleep(step.min(options.timeout - elapsed));
        }

        let exhaustion = Exhaustion {
            intent: description,
            strategies: strategies.len(),
            labels: strategies.labels().into_iter().map(str::to_string).collect(),
            attempts,
            elapsed_ms: millis(self.now().saturating_sub(start)),
        };
        tracing::debug!(
            intent = %exhaustion.intent,
            strategies = exhaustion.strategies,
            attempts,
            "no strategy qualified"
        );
        Ok(Outcome::NotFound(exhaustion))
    }

    fn qualify(&self, intent: &Intent, strategy: &Strategy, options: &ActOptions) -> Option<Candidate> {
        let (selector, text, allow_hidden) = match strategy {
            Strategy::Navigate { url, .. } => {
                return Some(Candidate {
                    target: Target::Page(url.clone()),
                    element: None,
                    via_ancestor: false,
                });
            }
            Strategy::Locate {
                selector,
                text,
                allow_hidden,
                ..
            } => (selector, text, *allow_hidden),
        };

        let selector = match intent.scope() {
            Some(scope) => selector.within(scope),
            None => selector.clone(),
        };
        let snapshot = match self.driver.snapshot(&selector, millis(self.now())) {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!(strategy = strategy.label(), error = %e, "query failed, treating as no match");
                return None;
            }
        };

        let filter = text.as_ref().or_else(|| intent.text_filter());
        let textual: Vec<&ElementHandle> = snapshot
            .elements
            .iter()
            .filter(|e| filter.map_or(true, |p| p.is_match(e.label())))
            .collect();
        let first = *textual.first()?;

        let direct = |e: &ElementHandle| Candidate {
            target: Target::Element(e.reference.clone()),
            element: Some(e.clone()),
            via_ancestor: false,
        };

        if !options.must_be_visible && !options.force_action {
            return Some(direct(first));
        }
        if let Some(visible) = textual.iter().find(|e| e.is_visible()).copied() {
            return Some(direct(visible));
        }
        if options.force_action && allow_hidden {
            let ancestors = match self.driver.ancestors(&first.reference) {
                Ok(a) => a,
                Err(e) => {
                    tracing::debug!(strategy = strategy.label(), error = %e, "ancestor walk failed");
                    return None;
                }
            };
            return ancestors.into_iter().find(ElementHandle::is_visible).map(|a| Candidate {
                target: Target::Element(a.reference.clone()),
                element: Some(a),
                via_ancestor: true,
            });
        }
        None
    }

    fn perform(&mut self, intent: &Intent, candidate: &Candidate, field_text: Option<&str>) -> ResoluteResult<()> {
        let reference = match &candidate.target {
            Target::Page(url) => return self.driver.navigate(url),
            Target::Element(r) => r,
        };
        self.driver.scroll_into_view(reference)?;
        match intent {
            Intent::Click { .. } => self.driver.click(reference),
            Intent::SetField { submit, .. } => {
                self.driver.type_text(reference, field_text.unwrap_or_default(), *submit)
            }
            Intent::ReadNumber { .. }
            | Intent::FindByText { .. }
            | Intent::AssertTextPresent { .. }
            | Intent::Navigate { .. } => Ok(()),
        }
    }

    fn finish<F>(
        &mut self,
        description: &str,
        mut resolution: Resolution,
        baseline: Option<Baseline>,
        options: &ActOptions,
        start: Duration,
        act: F,
    ) -> Outcome
    where
        F: FnOnce(&mut Self) -> ResoluteResult<()>,
    {
        if let Err(e) = act(self) {
            resolution.elapsed_ms = millis(self.now().saturating_sub(start));
            tracing::warn!(intent = description, error = %e, "action failed");
            return Outcome::ActionFailed {
                intent: description.to_string(),
                resolution,
                reason: e.to_string(),
            };
        }

        if let (Some(effect), Some(baseline)) = (options.expect.as_ref(), baseline) {
            if let Err(reason) = self.await_effect(effect, baseline, options) {
                resolution.elapsed_ms = millis(self.now().saturating_sub(start));
                tracing::warn!(intent = description, reason = %reason, "action had no effect");
                return Outcome::ActionFailed {
                    intent: description.to_string(),
                    resolution,
                    reason,
                };
            }
        }

        resolution.elapsed_ms = millis(self.now().saturating_sub(start));
        tracing::info!(
            intent = description,
            strategy = %resolution.strategy_label,
            attempts = resolution.attempts,
            "resolved"
        );
        Outcome::Succeeded(resolution)
    }

    fn await_effect(
        &self,
        effect: &Effect,
        baseline: Baseline,
        options: &ActOptions,
    ) -> Result<(), String> {
        let wait = WaitOptions::new()
            .with_timeout(millis(options.timeout))
            .with_poll_interval(millis(options.poll_interval))
            .waiting_for(effect.describe());
        let mut last = String::new();
        let result = self.poll_until(&wait, |driver| match effect.check(driver, &baseline) {
            None => Ok(Some(())),
            Some(observed) => {
                last = observed;
                Ok(None)
            }
        });
        result
            .map(|_| ())
            .map_err(|_| format!("expected {}, but {last}", effect.describe()))
    }
}

pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
