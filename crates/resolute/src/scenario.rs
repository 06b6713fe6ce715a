//! Scenarios: ordered steps run against one engine.
//!
//! A scenario fails only when a required step exhausts its fallbacks, an
//! assertion misses, or a convergence misses its target. Optional steps that
//! find nothing are recorded as skipped and the run continues.

use crate::driver::{Cookie, Driver};
use crate::effect::Effect;
use crate::engine::{millis, Engine, Outcome};
use crate::intent::Intent;
use crate::overlay::OverlaySweep;
use crate::pattern::TextPattern;
use crate::result::{ResoluteError, ResoluteResult};
use crate::stepper::{Convergence, ConvergenceReport};
use crate::strategy::{ActOptions, StrategyList};
use serde::Serialize;
use std::time::Duration;

/// Default bound for [`Step::ClickUntilGone`]
pub const DEFAULT_MAX_CLICKS: u32 = 60;

/// One engine action with its fallbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActStep {
    /// What should happen
    pub intent: Intent,
    /// How to find the target
    pub strategies: StrategyList,
    /// Timeout, visibility and effect options
    pub options: ActOptions,
    /// Whether exhaustion fails the scenario
    pub required: bool,
    /// Strategies tried once more after an `ActionFailed`
    pub retry: Option<StrategyList>,
}

impl ActStep {
    /// A required step with default options
    #[must_use]
    pub fn new(intent: Intent, strategies: StrategyList) -> Self {
        Self {
            intent,
            strategies,
            options: ActOptions::default(),
            required: true,
            retry: None,
        }
    }

    /// Set options
    #[must_use]
    pub fn with_options(mut self, options: ActOptions) -> Self {
        self.options = options;
        self
    }

    /// Mark as optional
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Retry an `ActionFailed` once with these strategies
    #[must_use]
    pub fn with_retry(mut self, retry: StrategyList) -> Self {
        self.retry = Some(retry);
        self
    }
}

/// Scenario step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Resolve an intent and act on it
    Act(ActStep),
    /// Best-effort overlay sweep
    DismissOverlays(OverlaySweep),
    /// Drive a counter to a target
    Converge(Convergence),
    /// Click the first match repeatedly until nothing matches
    ClickUntilGone {
        /// Semantic label
        label: String,
        /// Controls to click
        strategies: StrategyList,
        /// Upper bound on clicks
        max_clicks: u32,
        /// Pause after each click
        pause: Duration,
    },
    /// Set a cookie
    SetCookie(Cookie),
    /// Reload the page
    Reload,
    /// Navigate to `to` only when the current URL contains `when_url_contains`
    Redirect {
        /// URL fragment that triggers the redirect
        when_url_contains: String,
        /// Destination
        to: String,
    },
    /// Fail unless `effect` holds within the options' timeout
    Verify {
        /// What must hold
        effect: Effect,
        /// Timeout and poll interval
        options: ActOptions,
    },
    /// Run `step` only when `condition` does not already hold
    Unless {
        /// Checked once, without waiting
        condition: Effect,
        /// Step to run otherwise
        step: Box<Step>,
    },
}

impl Step {
    /// Short kind name for reports
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Act(_) => "act",
            Self::DismissOverlays(_) => "dismiss_overlays",
            Self::Converge(_) => "converge",
            Self::ClickUntilGone { .. } => "click_until_gone",
            Self::SetCookie(_) => "set_cookie",
            Self::Reload => "reload",
            Self::Redirect { .. } => "redirect",
            Self::Verify { .. } => "verify",
            Self::Unless { .. } => "unless",
        }
    }

    /// Secret referenced by this step, looking through `Unless`
    fn secret(&self) -> Option<&str> {
        match self {
            Self::Act(act) => act.intent.secret(),
            Self::Unless { step, .. } => step.secret(),
            _ => None,
        }
    }
}

/// A named step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioStep {
    /// Step name
    pub name: String,
    /// What to do
    pub step: Step,
}

/// A named sequence of steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    /// Steps in order
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    /// Create an empty scenario
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step
    #[must_use]
    pub fn step(mut self, name: impl Into<String>, step: Step) -> Self {
        self.steps.push(ScenarioStep {
            name: name.into(),
            step,
        });
        self
    }

    /// Append an act step
    #[must_use]
    pub fn act(self, name: impl Into<String>, act: ActStep) -> Self {
        self.step(name, Step::Act(act))
    }

    /// Secret names referenced by any step, deduplicated in first-use order
    #[must_use]
    pub fn secrets_required(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for s in &self.steps {
            if let Some(name) = s.step.secret() {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }
}

/// How a step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Completed
    Passed,
    /// Optional step found nothing
    Skipped,
    /// Scenario stopped here
    Failed,
}

/// Record of one executed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// Step name
    pub name: String,
    /// Step kind
    pub kind: String,
    /// Outcome
    pub status: StepStatus,
    /// Winning strategy label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    /// Polling rounds used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    /// Time spent (ms)
    pub elapsed_ms: u64,
    /// Detail or failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Result of running a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub scenario: String,
    /// Whether every executed step passed or was skipped
    pub passed: bool,
    /// Executed steps, in order
    pub steps: Vec<StepRecord>,
    /// Failure message naming the step and intent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    /// Total time (ms)
    pub elapsed_ms: u64,
}

impl ScenarioReport {
    /// Number of steps with `status`
    #[must_use]
    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    /// Render as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> ResoluteResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Escalate a failed run
    ///
    /// # Errors
    ///
    /// Returns [`ResoluteError::AssertionFailed`] carrying the failure message
    pub fn into_result(self) -> ResoluteResult<Self> {
        match (&self.failure, self.passed) {
            (Some(message), false) => Err(ResoluteError::AssertionFailed {
                message: message.clone(),
            }),
            _ => Ok(self),
        }
    }
}

/// Runs scenarios against an engine
#[derive(Debug, Clone, Copy, Default)]
pub struct ScenarioRunner;

struct StepResult {
    status: StepStatus,
    strategy: Option<String>,
    attempts: Option<u32>,
    message: Option<String>,
}

impl StepResult {
    const fn passed() -> Self {
        Self {
            status: StepStatus::Passed,
            strategy: None,
            attempts: None,
            message: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Failed,
            message: Some(message.into()),
            ..Self::passed()
        }
    }

    fn detail(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ScenarioRunner {
    /// Create a runner
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Run `scenario` to completion or to its first failing step
    ///
    /// # Errors
    ///
    /// Returns [`ResoluteError::PreconditionMissing`] before touching the page
    /// if a referenced secret is absent
    pub fn run<D: Driver>(&self, engine: &mut Engine<D>, scenario: &Scenario) -> ResoluteResult<ScenarioReport> {
        for name in scenario.secrets_required() {
            if !engine.credentials().contains(&name) {
                return Err(ResoluteError::precondition(format!(
                    "secret `{name}` required by scenario `{}`",
                    scenario.name
                )));
            }
        }

        tracing::info!(scenario = %scenario.name, steps = scenario.steps.len(), "running scenario");
        let started = engine.clock().elapsed();
        let mut steps = Vec::with_capacity(scenario.steps.len());
        let mut failure = None;

        for ScenarioStep { name, step } in &scenario.steps {
            let step_start = engine.clock().elapsed();
            let result = Self::execute(engine, step);
            let elapsed_ms = millis(engine.clock().elapsed().saturating_sub(step_start));

            match result.status {
                StepStatus::Passed => tracing::info!(step = %name, "step passed"),
                StepStatus::Skipped => tracing::warn!(step = %name, reason = ?result.message, "optional step skipped"),
                StepStatus::Failed => tracing::warn!(step = %name, reason = ?result.message, "step failed"),
            }
            if result.status == StepStatus::Failed {
                failure = Some(format!(
                    "step `{name}` failed: {}",
                    result.message.as_deref().unwrap_or("unknown error")
                ));
            }
            steps.push(StepRecord {
                name: name.clone(),
                kind: step.kind().to_string(),
                status: result.status,
                strategy: result.strategy,
                attempts: result.attempts,
                elapsed_ms,
                message: result.message,
            });
            if failure.is_some() {
                break;
            }
        }

        Ok(ScenarioReport {
            scenario: scenario.name.clone(),
            passed: failure.is_none(),
            steps,
            failure,
            elapsed_ms: millis(engine.clock().elapsed().saturating_sub(started)),
        })
    }

    fn execute<D: Driver>(engine: &mut Engine<D>, step: &Step) -> StepResult {
        match step {
            Step::Act(act) => Self::execute_act(engine, act),
            Step::DismissOverlays(sweep) => {
                let report = engine.dismiss_overlays(sweep);
                StepResult::passed().detail(format!("{} overlay(s) dismissed", report.clicks()))
            }
            Step::Converge(convergence) => match engine.converge(convergence).and_then(ConvergenceReport::into_result) {
                Ok(report) => StepResult::passed().detail(format!(
                    "{} reached {} after {} increment(s)",
                    report.label, report.final_value, report.increments
                )),
                Err(e) => StepResult::failed(e.to_string()),
            },
            Step::ClickUntilGone {
                label,
                strategies,
                max_clicks,
                pause,
            } => Self::click_until_gone(engine, label, strategies, *max_clicks, *pause),
            Step::SetCookie(cookie) => match engine.driver_mut().set_cookie(cookie) {
                Ok(()) => StepResult::passed(),
                Err(e) => StepResult::failed(e.to_string()),
            },
            Step::Reload => match engine.driver_mut().reload() {
                Ok(()) => StepResult::passed(),
                Err(e) => StepResult::failed(e.to_string()),
            },
            Step::Redirect { when_url_contains, to } => Self::redirect(engine, when_url_contains, to),
            Step::Verify { effect, options } => match engine.verify(effect, options) {
                Ok(()) => StepResult::passed().detail(effect.describe()),
                Err(e) => StepResult::failed(e.to_string()),
            },
            Step::Unless { condition, step } => {
                if engine.holds(condition) {
                    return StepResult::passed().detail(format!("not needed: {}", condition.describe()));
                }
                tracing::debug!(condition = %condition.describe(), kind = step.kind(), "condition missing, running step");
                let result = Self::execute(engine, step);
                if result.message.is_some() {
                    result
                } else {
                    result.detail(format!("ran {}", step.kind()))
                }
            }
        }
    }

    fn redirect<D: Driver>(engine: &mut Engine<D>, fragment: &str, to: &str) -> StepResult {
        let current = match engine.driver().current_url() {
            Ok(url) => url,
            Err(e) => return StepResult::failed(e.to_string()),
        };
        if !current.contains(fragment) {
            return StepResult::passed().detail(format!("stayed on {current}"));
        }
        tracing::info!(from = %current, to, "redirecting");
        match engine.driver_mut().navigate(to) {
            Ok(()) => StepResult::passed().detail(format!("redirected to {to}")),
            Err(e) => StepResult::failed(e.to_string()),
        }
    }

    fn execute_act<D: Driver>(engine: &mut Engine<D>, act: &ActStep) -> StepResult {
        let mut outcome = match engine.locate_and_act(&act.intent, &act.strategies, &act.options) {
            Ok(o) => o,
            Err(e) => return StepResult::failed(e.to_string()),
        };

        if let (Outcome::ActionFailed { reason, .. }, Some(retry)) = (&outcome, &act.retry) {
            tracing::info!(intent = %act.intent.describe(), reason = %reason, "retrying after failed action");
            outcome = match engine.locate_and_act(&act.intent, retry, &act.options) {
                Ok(o) => o,
                Err(e) => return StepResult::failed(e.to_string()),
            };
        }

        let resolution = outcome.resolution().cloned();
        let mut result = match outcome.into_result() {
            Ok(_) => StepResult::passed(),
            Err(e) if matches!(act.intent, Intent::AssertTextPresent { .. }) => StepResult::failed(
                ResoluteError::AssertionFailed {
                    message: e.to_string(),
                }
                .to_string(),
            ),
            Err(e) if act.required => StepResult::failed(e.to_string()),
            Err(e) => StepResult {
                status: StepStatus::Skipped,
                ..StepResult::failed(e.to_string())
            },
        };
        if let Some(r) = resolution {
            result.strategy = Some(r.strategy_label);
            result.attempts = Some(r.attempts);
        }
        result
    }

    fn click_until_gone<D: Driver>(
        engine: &mut Engine<D>,
        label: &str,
        strategies: &StrategyList,
        max_clicks: u32,
        pause: Duration,
    ) -> StepResult {
        let intent = Intent::click(label);
        let probe = ActOptions::new().with_timeout(Duration::ZERO).with_force(true);
        let mut clicks = 0_u32;

        while clicks < max_clicks {
            match engine.locate_and_act(&intent, strategies, &probe) {
                Ok(Outcome::Succeeded(_)) => {
                    clicks += 1;
                    engine.clock().sleep(pause);
                }
                Ok(Outcome::NotFound(_)) => {
                    return StepResult::passed().detail(format!("{clicks} click(s) until none left"));
                }
                Ok(Outcome::ActionFailed { reason, .. }) => {
                    tracing::debug!(label, reason = %reason, "click failed, retrying");
                    clicks += 1;
                    engine.clock().sleep(pause);
                }
                Err(e) => return StepResult::failed(e.to_string()),
            }
        }

        let lookup = Intent::find_text(TextPattern::any());
        let remaining = matches!(
            engine.locate_and_act(&lookup, strategies, &probe),
            Ok(Outcome::Succeeded(_))
        );
        if remaining {
            StepResult::failed(format!("{label} still present after {max_clicks} click(s)"))
        } else {
            StepResult::passed().detail(format!("{clicks} click(s) until none left"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::config::Credentials;
    use crate::intent::FieldValue;
    use crate::mock::{MockDriver, MockNode, Reaction};
    use crate::strategy::Strategy;

    fn engine(driver: MockDriver) -> Engine<MockDriver> {
        let (_, clock) = FakeClock::shared();
        Engine::with_clock(driver, clock)
    }

    fn fast() -> ActOptions {
        ActOptions::new().with_timeout_ms(500).with_poll_interval(Duration::from_millis(100))
    }

    fn click(css: &str) -> ActStep {
        ActStep::new(Intent::click(css), StrategyList::of(Strategy::css(css))).with_options(fast())
    }

    mod act_tests {
        use super::*;

        #[test]
        fn test_required_step_failure_stops_run() {
            let mut d = MockDriver::new("https://shop.test/");
            let body = d.root();
            let _ = d.append(body, MockNode::new("a").id("later"));
            let mut e = engine(d);
            let scenario = Scenario::new("track")
                .act("open tracking", ActStep::new(Intent::click("Track your package"), StrategyList::of(Strategy::css("#track"))).with_options(fast()))
                .act("never reached", click("#later"));
            let report = ScenarioRunner::new().run(&mut e, &scenario).unwrap();
            assert!(!report.passed);
            assert_eq!(report.steps.len(), 1);
            assert_eq!(report.steps[0].status, StepStatus::Failed);
            let failure = report.failure.clone().unwrap();
            assert!(failure.contains("open tracking"));
            assert!(failure.contains("Track your package"));
            assert!(e.driver().clicked().is_empty());
            assert!(matches!(report.into_result(), Err(ResoluteError::AssertionFailed { .. })));
        }

        #[test]
        fn test_optional_step_is_skipped() {
            let mut d = MockDriver::new("https://shop.test/");
            let body = d.root();
            let _ = d.append(body, MockNode::new("a").id("next"));
            let mut e = engine(d);
            let scenario = Scenario::new("s")
                .act("banner", click("#banner").optional())
                .act("next", click("#next"));
            let report = ScenarioRunner::new().run(&mut e, &scenario).unwrap();
            assert!(report.passed);
            assert_eq!(report.count(StepStatus::Skipped), 1);
            assert_eq!(report.count(StepStatus::Passed), 1);
            assert_eq!(report.steps[1].strategy.as_deref(), Some("#next"));
            assert_eq!(report.steps[1].attempts, Some(1));
        }

        #[test]
        fn test_missing_secret_fails_before_any_step() {
            let mut e = engine(MockDriver::new("https://shop.test/"));
            let scenario = Scenario::new("sign in")
                .step("home", Step::Act(ActStep::new(Intent::navigate("https://shop.test/"), StrategyList::of(Strategy::navigate("https://shop.test/")))))
                .act(
                    "password",
                    ActStep::new(Intent::set_field("password", FieldValue::secret("password")), StrategyList::of(Strategy::css("#ap_password"))),
                );
            assert_eq!(scenario.secrets_required(), vec!["password"]);
            let err = ScenarioRunner::new().run(&mut e, &scenario).unwrap_err();
            assert!(matches!(err, ResoluteError::PreconditionMissing { .. }));
            assert!(e.driver().history().is_empty());
        }

        #[test]
        fn test_present_secret_passes_precheck() {
            let mut d = MockDriver::new("https://shop.test/ap/signin");
            let body = d.root();
            let field = d.append(body, MockNode::new("input").id("ap_password"));
            let mut e = engine(d).with_credentials(Credentials::new().with("password", "hunter2"));
            let scenario = Scenario::new("sign in").act(
                "password",
                ActStep::new(Intent::set_field("password", FieldValue::secret("password")), StrategyList::of(Strategy::css("#ap_password"))),
            );
            let report = ScenarioRunner::new().run(&mut e, &scenario).unwrap();
            assert!(report.passed);
            assert_eq!(e.driver().value_of(field).as_deref(), Some("hunter2"));
            assert!(!report.to_json().unwrap().contains("hunter2"));
        }

        #[test]
        fn test_action_failure_retried_with_fallbacks() {
            let mut d = MockDriver::new("https://shop.test/");
            let body = d.root();
            let dead = d.append(body, MockNode::new("button").id("dead"));
            let _ = d.append(body, MockNode::new("button").id("alive"));
            d.fail_click(dead);
            let mut e = engine(d);
            let scenario = Scenario::new("s").act("go", click("#dead").with_retry(StrategyList::of(Strategy::css("#alive"))));
            let report = ScenarioRunner::new().run(&mut e, &scenario).unwrap();
            assert!(report.passed);
            assert_eq!(report.steps[0].strategy.as_deref(), Some("#alive"));
        }

        #[test]
        fn test_missing_text_is_assertion_failure() {
            let mut d = MockDriver::new("https://shop.test/cart");
            let body = d.root();
            let _ = d.append(body, MockNode::new("h1").text("Shopping Cart"));
            let mut e = engine(d);
            let scenario = Scenario::new("s").act(
                "empty",
                ActStep::new(Intent::assert_text(TextPattern::contains("is empty")), StrategyList::of(Strategy::css("h1")))
                    .with_options(fast())
                    .optional(),
            );
            let report = ScenarioRunner::new().run(&mut e, &scenario).unwrap();
            assert!(!report.passed);
            assert!(report.failure.unwrap().contains("assertion failed"));
        }
    }

    mod step_tests {
        use super::*;

        fn cart_with(items: usize) -> MockDriver {
            let mut d = MockDriver::new("https://shop.test/cart");
            let body = d.root();
            for _ in 0..items {
                let row = d.append(body, MockNode::new("div").class("sc-list-item"));
                let delete = d.append(row, MockNode::new("input").attr("value", "Delete"));
                d.on_click(delete, Reaction::Remove(row));
            }
            d
        }

        fn delete_all(max_clicks: u32) -> Step {
            Step::ClickUntilGone {
                label: "delete".into(),
                strategies: StrategyList::of(Strategy::css(r#"input[value="Delete"]"#)),
                max_clicks,
                pause: Duration::from_millis(50),
            }
        }

        #[test]
        fn test_click_until_gone_clears_all() {
            let mut e = engine(cart_with(3));
            let report = ScenarioRunner::new()
                .run(&mut e, &Scenario::new("clear").step("clear cart", delete_all(DEFAULT_MAX_CLICKS)))
                .unwrap();
            assert!(report.passed);
            assert_eq!(e.driver().clicked().len(), 3);
            assert!(report.steps[0].message.as_deref().unwrap().starts_with("3 click"));
        }

        #[test]
        fn test_click_until_gone_on_empty_cart() {
            let mut e = engine(cart_with(0));
            let report = ScenarioRunner::new()
                .run(&mut e, &Scenario::new("clear").step("clear cart", delete_all(DEFAULT_MAX_CLICKS)))
                .unwrap();
            assert!(report.passed);
            assert!(e.driver().clicked().is_empty());
        }

        #[test]
        fn test_click_until_gone_is_bounded() {
            let mut e = engine(cart_with(4));
            let report = ScenarioRunner::new()
                .run(&mut e, &Scenario::new("clear").step("clear cart", delete_all(2)))
                .unwrap();
            assert!(!report.passed);
            assert_eq!(e.driver().clicked().len(), 2);
        }

        #[test]
        fn test_redirect_only_when_url_matches() {
            let mut e = engine(MockDriver::new("https://shop.test/ap/signin?return=orders"));
            let redirect = |to: &str| Step::Redirect {
                when_url_contains: "signin".into(),
                to: to.into(),
            };
            let scenario = Scenario::new("r")
                .step("away from sign-in", redirect("https://shop.test/orders"))
                .step("already away", redirect("https://shop.test/elsewhere"));
            let report = ScenarioRunner::new().run(&mut e, &scenario).unwrap();
            assert!(report.passed);
            assert_eq!(e.driver().url(), "https://shop.test/orders");
            assert_eq!(e.driver().history(), vec!["navigate:https://shop.test/orders"]);
        }

        #[test]
        fn test_cookie_reload_and_sweep() {
            let mut e = engine(MockDriver::new("https://shop.test/"));
            let scenario = Scenario::new("prep")
                .step("english", Step::SetCookie(Cookie::new("lc-main", "en_US")))
                .step("reload", Step::Reload)
                .step("overlays", Step::DismissOverlays(OverlaySweep::default()));
            let report = ScenarioRunner::new().run(&mut e, &scenario).unwrap();
            assert!(report.passed);
            assert_eq!(e.driver().history(), vec!["cookie:lc-main", "reload"]);
            assert_eq!(report.steps[2].message.as_deref(), Some("0 overlay(s) dismissed"));
            let json = report.to_json().unwrap();
            assert!(json.contains("\"kind\": \"set_cookie\""));
            assert!(json.contains("\"status\": \"passed\""));
        }

        fn reload_unless_english() -> Step {
            Step::Unless {
                condition: Effect::Present {
                    selector: crate::strategy::Selector::css(r#"body[lang^="en"]"#),
                    text: None,
                },
                step: Box::new(Step::Reload),
            }
        }

        #[test]
        fn test_unless_skips_when_condition_holds() {
            let mut d = MockDriver::new("https://shop.test/");
            let body = d.root();
            d.set_attribute(body, "lang", "en-US");
            let mut e = engine(d);
            let report = ScenarioRunner::new()
                .run(&mut e, &Scenario::new("lang").step("english ui", reload_unless_english()))
                .unwrap();
            assert!(report.passed);
            assert!(!e.driver().was_called("reload"));
            assert!(report.steps[0].message.as_deref().unwrap().starts_with("not needed"));
        }

        #[test]
        fn test_unless_runs_step_when_condition_missing() {
            let mut d = MockDriver::new("https://shop.test/");
            let body = d.root();
            d.set_attribute(body, "lang", "de-DE");
            let mut e = engine(d);
            let report = ScenarioRunner::new()
                .run(&mut e, &Scenario::new("lang").step("english ui", reload_unless_english()))
                .unwrap();
            assert!(report.passed);
            assert_eq!(e.driver().history(), vec!["reload"]);
            assert_eq!(report.steps[0].kind, "unless");
            assert_eq!(report.steps[0].message.as_deref(), Some("ran reload"));
        }

        #[test]
        fn test_secret_inside_unless_is_required() {
            let inner = ActStep::new(
                Intent::set_field("email", FieldValue::secret(Credentials::EMAIL)),
                StrategyList::of(Strategy::css("#ap_email")),
            );
            let scenario = Scenario::new("s").step(
                "email if asked",
                Step::Unless {
                    condition: Effect::UrlContains("/cart".into()),
                    step: Box::new(Step::Act(inner)),
                },
            );
            assert_eq!(scenario.secrets_required(), vec![Credentials::EMAIL]);
        }

        #[test]
        fn test_verify_step() {
            let mut d = MockDriver::new("https://shop.test/cart");
            let body = d.root();
            let _ = d.append(body, MockNode::new("span").text("Hello, sign in"));
            let mut e = engine(d);
            let verify = |effect: Effect| Step::Verify { effect, options: fast() };
            let scenario = Scenario::new("v")
                .step("on cart", verify(Effect::UrlContains("/cart".into())))
                .step("signed in", verify(Effect::TextAbsent(TextPattern::contains("Hello, sign in"))));
            let report = ScenarioRunner::new().run(&mut e, &scenario).unwrap();
            assert!(!report.passed);
            assert_eq!(report.steps[0].status, StepStatus::Passed);
            let failure = report.failure.unwrap();
            assert!(failure.starts_with("step `signed in` failed: assertion failed"));
            assert!(failure.contains("Hello, sign in"));
        }
    }
}
