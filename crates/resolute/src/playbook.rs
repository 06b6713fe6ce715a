//! Playbook YAML schema: scenarios as data.
//!
//! ```yaml
//! version: "1.0"
//! name: help-center
//! steps:
//!   - id: home
//!     type: navigate
//!     url: "https://shop.test/?language=en_US"
//!   - id: customer-service
//!     type: click
//!     target: customer service
//!     strategies:
//!       - css: "a"
//!         text: "Customer Service|Help"
//!       - navigate: "https://shop.test/help"
//! ```
//!
//! Parsing validates the whole document, so a playbook that loads always
//! converts into a [`Scenario`].

use crate::driver::Cookie;
use crate::effect::Effect;
use crate::intent::{FieldValue, Intent};
use crate::overlay::{OverlayGroup, OverlaySweep};
use crate::pattern::TextPattern;
use crate::result::ResoluteError;
use crate::scenario::{ActStep, Scenario, Step, DEFAULT_MAX_CLICKS};
use crate::stepper::Convergence;
use crate::strategy::{ActOptions, Selector, Strategy, StrategyList};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

/// Supported schema version
pub const PLAYBOOK_VERSION: &str = "1.0";

/// Default pause between `click_until_gone` clicks (ms)
pub const DEFAULT_PAUSE_MS: u64 = 300;

/// Root playbook document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playbook {
    /// Schema version (must be "1.0")
    pub version: String,
    /// Playbook name
    pub name: String,
    /// Playbook description
    #[serde(default)]
    pub description: String,
    /// Steps in order
    #[serde(default)]
    pub steps: Vec<PlaybookStep>,
    /// Optional metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// One playbook step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookStep {
    /// Unique step identifier
    pub id: String,
    /// What the step does
    #[serde(flatten)]
    pub action: StepAction,
    /// Strategies for element-targeting steps
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strategies: Vec<StrategySpec>,
    /// Fallbacks tried once after a failed action
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retry: Vec<StrategySpec>,
    /// Whether exhaustion fails the playbook
    #[serde(default = "default_required")]
    pub required: bool,
    /// Per-step overrides
    #[serde(default)]
    pub options: OptionsSpec,
}

const fn default_required() -> bool {
    true
}

/// Step kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepAction {
    /// Navigate to a URL
    Navigate { url: String },
    /// Click the resolved element
    Click { target: String },
    /// Read an integer from the resolved element
    ReadNumber { target: String },
    /// Clear and type into a field; exactly one of `value` and `secret`
    Fill {
        target: String,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        secret: Option<String>,
        #[serde(default)]
        submit: bool,
    },
    /// Locate text without acting
    FindText {
        pattern: String,
        #[serde(default)]
        scope: Option<String>,
    },
    /// Fail unless the text is present
    AssertText { pattern: String },
    /// Overlay sweep; the default groups when `groups` is empty
    DismissOverlays {
        #[serde(default)]
        groups: Vec<OverlayGroupSpec>,
    },
    /// Drive a counter up to `target`
    Converge {
        label: String,
        reader: Vec<StrategySpec>,
        increment: Vec<StrategySpec>,
        target: i64,
        #[serde(default)]
        max_iterations: Option<u32>,
        #[serde(default)]
        settle: Option<String>,
    },
    /// Click the first match until none remain
    ClickUntilGone {
        label: String,
        #[serde(default)]
        max_clicks: Option<u32>,
        #[serde(default)]
        pause_ms: Option<u64>,
    },
    /// Set a cookie
    SetCookie(Cookie),
    /// Reload the page
    Reload,
    /// Navigate to `to` when the current URL contains `when_url_contains`
    Redirect { when_url_contains: String, to: String },
    /// Fail unless the effect holds within the step timeout
    Verify { expect: EffectSpec },
    /// Run `then` only when `condition` does not hold; `then` uses this step's strategies and options
    Unless {
        condition: EffectSpec,
        then: Box<StepAction>,
    },
}

impl StepAction {
    /// Whether `strategies` must be non-empty
    fn needs_strategies(&self) -> bool {
        match self {
            Self::Click { .. }
            | Self::ReadNumber { .. }
            | Self::Fill { .. }
            | Self::FindText { .. }
            | Self::AssertText { .. }
            | Self::ClickUntilGone { .. } => true,
            Self::Unless { then, .. } => then.needs_strategies(),
            _ => false,
        }
    }
}

/// A strategy in YAML form; exactly one of `css`, `test_id`, `navigate`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategySpec {
    /// CSS selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    /// `data-testid` value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    /// Direct navigation URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigate: Option<String>,
    /// Case-insensitive regex over element text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Allow redirection from a hidden match to its visible ancestor
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_hidden: bool,
    /// Report label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Overlay group in YAML form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayGroupSpec {
    /// Group label
    pub label: String,
    /// Patterns in priority order
    pub strategies: Vec<StrategySpec>,
}

/// Per-step option overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionsSpec {
    /// Timeout (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Poll interval (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
    /// Visibility requirement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    /// Forced action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
    /// Required effect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<EffectSpec>,
}

/// Effect in YAML form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectSpec {
    /// Counter rises by `by` (default 1)
    CounterIncrement {
        selector: String,
        #[serde(default = "default_increment")]
        by: i64,
    },
    /// URL contains a fragment
    UrlContains { value: String },
    /// Element present
    Present {
        selector: String,
        #[serde(default)]
        text: Option<String>,
    },
    /// Element gone
    Gone { selector: String },
    /// Rendered page text does not match
    TextAbsent { pattern: String },
    /// Source attribute value reaches at least one sink
    Propagated {
        source: String,
        attribute: String,
        sinks: Vec<SinkSpec>,
    },
    /// Every nested effect holds
    All { effects: Vec<EffectSpec> },
    /// At least one nested effect holds
    Any { effects: Vec<EffectSpec> },
}

/// Where a propagated value may appear
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkSpec {
    /// Element selector
    pub selector: String,
    /// Attribute name; `value` reads the live field value
    pub attribute: String,
}

const fn default_increment() -> i64 {
    1
}

/// Errors that can occur during playbook parsing and validation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlaybookError {
    #[error("Failed to read playbook {path}: {message}")]
    ReadError { path: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    ParseError(String),

    #[error("Invalid version '{0}', expected '1.0'")]
    InvalidVersion(String),

    #[error("Steps cannot be empty")]
    EmptySteps,

    #[error("Duplicate step id '{0}'")]
    DuplicateStepId(String),

    #[error("Step '{step}' needs at least one strategy")]
    EmptyStrategies { step: String },

    #[error("Step '{step}' has an invalid strategy: {message}")]
    InvalidStrategy { step: String, message: String },

    #[error("Step '{step}' has an invalid text pattern '{pattern}': {message}")]
    InvalidPattern {
        step: String,
        pattern: String,
        message: String,
    },

    #[error("Step '{step}' is invalid: {message}")]
    InvalidStep { step: String, message: String },
}

impl From<PlaybookError> for ResoluteError {
    fn from(e: PlaybookError) -> Self {
        Self::invalid(e.to_string())
    }
}

impl Playbook {
    /// Parse a playbook from YAML string.
    ///
    /// # Errors
    /// Returns error if YAML is invalid or schema validation fails.
    pub fn from_yaml(yaml: &str) -> Result<Self, PlaybookError> {
        let playbook: Playbook =
            serde_yaml_ng::from_str(yaml).map_err(|e| PlaybookError::ParseError(e.to_string()))?;
        playbook.validate()?;
        Ok(playbook)
    }

    /// Read and parse a playbook file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a valid playbook.
    pub fn load(path: &Path) -> Result<Self, PlaybookError> {
        let yaml = std::fs::read_to_string(path).map_err(|e| PlaybookError::ReadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml(&yaml)
    }

    /// Render back to YAML.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, PlaybookError> {
        serde_yaml_ng::to_string(self).map_err(|e| PlaybookError::ParseError(e.to_string()))
    }

    /// Validate the playbook structure.
    fn validate(&self) -> Result<(), PlaybookError> {
        if self.version != PLAYBOOK_VERSION {
            return Err(PlaybookError::InvalidVersion(self.version.clone()));
        }
        if self.steps.is_empty() {
            return Err(PlaybookError::EmptySteps);
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.id.as_str()) {
                return Err(PlaybookError::DuplicateStepId(step.id.clone()));
            }
            if step.action.needs_strategies() && step.strategies.is_empty() {
                return Err(PlaybookError::EmptyStrategies { step: step.id.clone() });
            }
        }

        // Conversion checks strategies, patterns and field values.
        self.to_scenario(&ActOptions::default()).map(|_| ())
    }

    /// Build the scenario, with `base` as the options every step starts from.
    ///
    /// # Errors
    /// Returns error if a strategy, pattern or field value is malformed.
    pub fn to_scenario(&self, base: &ActOptions) -> Result<Scenario, PlaybookError> {
        let mut scenario = Scenario::new(self.name.clone());
        for step in &self.steps {
            scenario = scenario.step(step.id.clone(), step.to_step(base)?);
        }
        Ok(scenario)
    }

    /// Number of steps
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

impl PlaybookStep {
    fn to_step(&self, base: &ActOptions) -> Result<Step, PlaybookError> {
        let id = &self.id;
        let options = self.options.apply(id, base.clone())?;

        let intent = match &self.action {
            StepAction::Navigate { url } => Intent::navigate(url.clone()),
            StepAction::Click { target } => Intent::click(target.clone()),
            StepAction::ReadNumber { target } => Intent::read_number(target.clone()),
            StepAction::Fill {
                target,
                value,
                secret,
                submit,
            } => {
                let value = match (value, secret) {
                    (Some(v), None) => FieldValue::literal(v.clone()),
                    (None, Some(s)) => FieldValue::secret(s.clone()),
                    _ => {
                        return Err(PlaybookError::InvalidStep {
                            step: id.clone(),
                            message: "fill needs exactly one of `value` and `secret`".to_string(),
                        })
                    }
                };
                let intent = Intent::set_field(target.clone(), value);
                if *submit {
                    intent.submitting()
                } else {
                    intent
                }
            }
            StepAction::FindText { pattern, scope } => Intent::FindByText {
                pattern: compile(id, pattern)?,
                scope: scope.as_ref().map(Selector::css),
            },
            StepAction::AssertText { pattern } => Intent::assert_text(compile(id, pattern)?),
            StepAction::DismissOverlays { groups } => {
                if groups.is_empty() {
                    return Ok(Step::DismissOverlays(OverlaySweep::default()));
                }
                let mut sweep = OverlaySweep::empty();
                for group in groups {
                    let patterns = group
                        .strategies
                        .iter()
                        .map(|s| s.to_strategy(id))
                        .collect::<Result<Vec<_>, _>>()?;
                    sweep = sweep.with_group(OverlayGroup::new(group.label.clone(), patterns));
                }
                return Ok(Step::DismissOverlays(sweep));
            }
            StepAction::Converge {
                label,
                reader,
                increment,
                target,
                max_iterations,
                settle,
            } => {
                let mut convergence =
                    Convergence::new(label.clone(), strategy_list(id, reader)?, strategy_list(id, increment)?, *target)
                        .with_options(options);
                if let Some(max) = max_iterations {
                    convergence = convergence.with_max_iterations(*max);
                }
                if let Some(settle) = settle {
                    convergence = convergence.with_settle(Selector::css(settle.clone()));
                }
                return Ok(Step::Converge(convergence));
            }
            StepAction::ClickUntilGone {
                label,
                max_clicks,
                pause_ms,
            } => {
                return Ok(Step::ClickUntilGone {
                    label: label.clone(),
                    strategies: strategy_list(id, &self.strategies)?,
                    max_clicks: max_clicks.unwrap_or(DEFAULT_MAX_CLICKS),
                    pause: Duration::from_millis(pause_ms.unwrap_or(DEFAULT_PAUSE_MS)),
                });
            }
            StepAction::SetCookie(cookie) => return Ok(Step::SetCookie(cookie.clone())),
            StepAction::Reload => return Ok(Step::Reload),
            StepAction::Redirect { when_url_contains, to } => {
                return Ok(Step::Redirect {
                    when_url_contains: when_url_contains.clone(),
                    to: to.clone(),
                })
            }
            StepAction::Verify { expect } => {
                return Ok(Step::Verify {
                    effect: expect.to_effect(id)?,
                    options,
                })
            }
            StepAction::Unless { condition, then } => {
                let inner = Self {
                    action: (**then).clone(),
                    ..self.clone()
                };
                return Ok(Step::Unless {
                    condition: condition.to_effect(id)?,
                    step: Box::new(inner.to_step(base)?),
                });
            }
        };

        let strategies = if self.strategies.is_empty() {
            // Only navigate reaches here without strategies.
            let url = match &intent {
                Intent::Navigate { url } => url.clone(),
                _ => return Err(PlaybookError::EmptyStrategies { step: id.clone() }),
            };
            StrategyList::of(Strategy::navigate(url))
        } else {
            strategy_list(id, &self.strategies)?
        };

        let mut act = ActStep::new(intent, strategies).with_options(options);
        if !self.required {
            act = act.optional();
        }
        if !self.retry.is_empty() {
            act = act.with_retry(strategy_list(id, &self.retry)?);
        }
        Ok(Step::Act(act))
    }
}

impl StrategySpec {
    fn to_strategy(&self, step: &str) -> Result<Strategy, PlaybookError> {
        let invalid = |message: &str| PlaybookError::InvalidStrategy {
            step: step.to_string(),
            message: message.to_string(),
        };
        let strategy = match (&self.css, &self.test_id, &self.navigate) {
            (Some(css), None, None) => Strategy::css(css.clone()),
            (None, Some(id), None) => Strategy::test_id(id.clone()),
            (None, None, Some(url)) => {
                if self.text.is_some() || self.allow_hidden {
                    return Err(invalid("navigate takes no `text` or `allow_hidden`"));
                }
                Strategy::navigate(url.clone())
            }
            _ => return Err(invalid("needs exactly one of `css`, `test_id`, `navigate`")),
        };
        let strategy = match &self.text {
            Some(text) => strategy.with_text(compile(step, text)?),
            None => strategy,
        };
        let strategy = if self.allow_hidden {
            strategy.allow_hidden()
        } else {
            strategy
        };
        Ok(match &self.label {
            Some(label) => strategy.labelled(label.clone()),
            None => strategy,
        })
    }
}

impl OptionsSpec {
    fn apply(&self, step: &str, mut options: ActOptions) -> Result<ActOptions, PlaybookError> {
        if let Some(ms) = self.timeout_ms {
            options = options.with_timeout_ms(ms);
        }
        if let Some(ms) = self.poll_interval_ms {
            options = options.with_poll_interval(Duration::from_millis(ms));
        }
        if let Some(visible) = self.visible {
            options = options.with_visible(visible);
        }
        if let Some(force) = self.force {
            options = options.with_force(force);
        }
        if let Some(expect) = &self.expect {
            options = options.expecting(expect.to_effect(step)?);
        }
        Ok(options)
    }
}

impl EffectSpec {
    fn to_effect(&self, step: &str) -> Result<Effect, PlaybookError> {
        Ok(match self {
            Self::CounterIncrement { selector, by } => Effect::CounterIncrement {
                selector: Selector::css(selector.clone()),
                by: *by,
            },
            Self::UrlContains { value } => Effect::UrlContains(value.clone()),
            Self::Present { selector, text } => Effect::Present {
                selector: Selector::css(selector.clone()),
                text: text.as_deref().map(|t| compile(step, t)).transpose()?,
            },
            Self::Gone { selector } => Effect::Gone {
                selector: Selector::css(selector.clone()),
            },
            Self::TextAbsent { pattern } => Effect::TextAbsent(compile(step, pattern)?),
            Self::Propagated {
                source,
                attribute,
                sinks,
            } => {
                if sinks.is_empty() {
                    return Err(PlaybookError::InvalidStep {
                        step: step.to_string(),
                        message: "propagated effect needs at least one sink".to_string(),
                    });
                }
                Effect::Propagated {
                    source: Selector::css(source.clone()),
                    attribute: attribute.clone(),
                    sinks: sinks
                        .iter()
                        .map(|s| (Selector::css(s.selector.clone()), s.attribute.clone()))
                        .collect(),
                }
            }
            Self::All { effects } => Effect::All(nested_effects(step, effects)?),
            Self::Any { effects } => Effect::Any(nested_effects(step, effects)?),
        })
    }
}

fn nested_effects(step: &str, specs: &[EffectSpec]) -> Result<Vec<Effect>, PlaybookError> {
    if specs.is_empty() {
        return Err(PlaybookError::InvalidStep {
            step: step.to_string(),
            message: "`all`/`any` need at least one effect".to_string(),
        });
    }
    specs.iter().map(|e| e.to_effect(step)).collect()
}

fn compile(step: &str, pattern: &str) -> Result<TextPattern, PlaybookError> {
    TextPattern::new(pattern).map_err(|e| PlaybookError::InvalidPattern {
        step: step.to_string(),
        pattern: pattern.to_string(),
        message: match e {
            ResoluteError::InvalidPattern { message, .. } => message,
            other => other.to_string(),
        },
    })
}

fn strategy_list(step: &str, specs: &[StrategySpec]) -> Result<StrategyList, PlaybookError> {
    let strategies = specs
        .iter()
        .map(|s| s.to_strategy(step))
        .collect::<Result<Vec<_>, _>>()?;
    StrategyList::new(strategies).map_err(|_| PlaybookError::EmptyStrategies { step: step.to_string() })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    const VALID_PLAYBOOK: &str = r##"
version: "1.0"
name: "help-center"
description: "Reach the help center and track a package"
steps:
  - id: english
    type: set_cookie
    name: lc-main
    value: en_US
  - id: home
    type: navigate
    url: "https://shop.test/?language=en_US"
  - id: overlays
    type: dismiss_overlays
  - id: customer-service
    type: click
    target: customer service
    strategies:
      - css: "a"
        text: "Customer Service|Help"
      - navigate: "https://shop.test/help"
        label: direct help url
    options:
      force: true
      expect:
        type: url_contains
        value: /help
  - id: wims
    type: click
    target: Where's My Stuff
    required: false
    strategies:
      - css: "*"
        text: "Where('?s| is) My Stuff"
        allow_hidden: true
  - id: quantity
    type: converge
    label: quantity
    target: 4
    settle: ".a-spinner"
    reader:
      - css: '[data-a-selector="value"]'
    increment:
      - css: '[data-a-selector="increment"]'
  - id: password
    type: fill
    target: password
    secret: password
    submit: true
    strategies:
      - css: "#ap_password"
  - id: clear
    type: click_until_gone
    label: delete
    strategies:
      - css: 'input[value="Delete"]'
  - id: refresh
    type: reload
  - id: empty
    type: assert_text
    pattern: "Your .* Cart is empty"
    strategies:
      - css: "body"
"##;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_parse_valid_playbook() {
            let pb = Playbook::from_yaml(VALID_PLAYBOOK).unwrap();
            assert_eq!(pb.name, "help-center");
            assert_eq!(pb.step_count(), 10);
            assert!(!pb.steps[4].required);
            assert!(matches!(pb.steps[0].action, StepAction::SetCookie(_)));
            assert!(matches!(pb.steps[8].action, StepAction::Reload));
        }

        #[test]
        fn test_parse_error_invalid_yaml() {
            let result = Playbook::from_yaml("version: [unclosed");
            assert!(matches!(result, Err(PlaybookError::ParseError(_))));
        }

        #[test]
        fn test_unknown_step_type() {
            let yaml = "version: \"1.0\"\nname: x\nsteps:\n  - id: a\n    type: teleport\n";
            assert!(matches!(Playbook::from_yaml(yaml), Err(PlaybookError::ParseError(_))));
        }

        #[test]
        fn test_yaml_round_trip_keeps_steps() {
            let pb = Playbook::from_yaml(VALID_PLAYBOOK).unwrap();
            let again = Playbook::from_yaml(&pb.to_yaml().unwrap()).unwrap();
            assert_eq!(again.step_count(), pb.step_count());
        }
    }

    mod validation_tests {
        use super::*;

        fn with_steps(steps: &str) -> String {
            format!("version: \"1.0\"\nname: x\nsteps:\n{steps}")
        }

        #[test]
        fn test_reject_invalid_version() {
            let yaml = VALID_PLAYBOOK.replace("version: \"1.0\"", "version: \"2.0\"");
            assert!(matches!(Playbook::from_yaml(&yaml), Err(PlaybookError::InvalidVersion(_))));
        }

        #[test]
        fn test_reject_empty_steps() {
            let yaml = "version: \"1.0\"\nname: x\nsteps: []\n";
            assert!(matches!(Playbook::from_yaml(yaml), Err(PlaybookError::EmptySteps)));
        }

        #[test]
        fn test_reject_duplicate_ids() {
            let yaml = with_steps("  - id: a\n    type: reload\n  - id: a\n    type: reload\n");
            assert!(matches!(Playbook::from_yaml(&yaml), Err(PlaybookError::DuplicateStepId(id)) if id == "a"));
        }

        #[test]
        fn test_reject_click_without_strategies() {
            let yaml = with_steps("  - id: a\n    type: click\n    target: cart\n");
            assert!(matches!(Playbook::from_yaml(&yaml), Err(PlaybookError::EmptyStrategies { .. })));
        }

        #[test]
        fn test_reject_bad_regex() {
            let yaml = with_steps("  - id: a\n    type: assert_text\n    pattern: \"(unclosed\"\n    strategies:\n      - css: body\n");
            assert!(matches!(Playbook::from_yaml(&yaml), Err(PlaybookError::InvalidPattern { .. })));
        }

        #[test]
        fn test_reject_ambiguous_strategy() {
            let yaml = with_steps("  - id: a\n    type: click\n    target: t\n    strategies:\n      - css: a\n        navigate: https://x.test\n");
            assert!(matches!(Playbook::from_yaml(&yaml), Err(PlaybookError::InvalidStrategy { .. })));
        }

        #[test]
        fn test_reject_fill_without_value() {
            let yaml = with_steps("  - id: a\n    type: fill\n    target: t\n    strategies:\n      - css: input\n");
            assert!(matches!(Playbook::from_yaml(&yaml), Err(PlaybookError::InvalidStep { .. })));
        }

        #[test]
        fn test_error_converts_to_invalid_definition() {
            let err: ResoluteError = PlaybookError::EmptySteps.into();
            assert!(matches!(err, ResoluteError::InvalidDefinition { .. }));
        }
    }

    mod conversion_tests {
        use super::*;

        #[test]
        fn test_to_scenario() {
            let pb = Playbook::from_yaml(VALID_PLAYBOOK).unwrap();
            let scenario = pb.to_scenario(&ActOptions::new().with_timeout_ms(2000)).unwrap();
            assert_eq!(scenario.name, "help-center");
            assert_eq!(scenario.steps.len(), 10);
            assert_eq!(scenario.secrets_required(), vec!["password"]);

            match &scenario.steps[3].step {
                Step::Act(act) => {
                    assert_eq!(act.strategies.labels(), vec!["a ~ /Customer Service|Help/i", "direct help url"]);
                    assert!(act.options.force_action);
                    assert_eq!(act.options.timeout, Duration::from_millis(2000));
                    assert_eq!(act.options.expect, Some(Effect::UrlContains("/help".into())));
                }
                other => panic!("unexpected {other:?}"),
            }
            match &scenario.steps[5].step {
                Step::Converge(c) => {
                    assert_eq!(c.target, 4);
                    assert_eq!(c.settle, Some(Selector::css(".a-spinner")));
                }
                other => panic!("unexpected {other:?}"),
            }
            match &scenario.steps[7].step {
                Step::ClickUntilGone { max_clicks, pause, .. } => {
                    assert_eq!(*max_clicks, DEFAULT_MAX_CLICKS);
                    assert_eq!(*pause, Duration::from_millis(DEFAULT_PAUSE_MS));
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn test_navigate_without_strategies_navigates_directly() {
            let pb = Playbook::from_yaml(VALID_PLAYBOOK).unwrap();
            let scenario = pb.to_scenario(&ActOptions::default()).unwrap();
            match &scenario.steps[1].step {
                Step::Act(act) => assert_eq!(act.strategies.len(), 1),
                other => panic!("unexpected {other:?}"),
            }
        }

        const GUARDED: &str = r##"
version: "1.0"
name: guarded
steps:
  - id: english-ui
    type: unless
    condition:
      type: present
      selector: 'html[lang^="en"]'
    then:
      type: reload
  - id: buying-choices
    type: unless
    condition:
      type: present
      selector: "#add-to-cart-button"
    then:
      type: click
      target: see all buying choices
    required: false
    strategies:
      - css: "#buybox-see-all-buying-choices"
  - id: signed-in
    type: verify
    options:
      timeout_ms: 5000
    expect:
      type: all
      effects:
        - type: url_contains
          value: /cart
        - type: text_absent
          pattern: "Hello, sign in"
        - type: propagated
          source: "li[data-asin]"
          attribute: data-asin
          sinks:
            - selector: 'input[name="ASIN"]'
              attribute: value
"##;

        #[test]
        fn test_unless_and_verify_steps() {
            let scenario = Playbook::from_yaml(GUARDED).unwrap().to_scenario(&ActOptions::default()).unwrap();
            match &scenario.steps[0].step {
                Step::Unless { step, .. } => assert_eq!(**step, Step::Reload),
                other => panic!("unexpected {other:?}"),
            }
            match &scenario.steps[1].step {
                Step::Unless { step, .. } => match step.as_ref() {
                    Step::Act(act) => {
                        assert!(!act.required);
                        assert_eq!(act.strategies.labels(), vec!["#buybox-see-all-buying-choices"]);
                    }
                    other => panic!("unexpected {other:?}"),
                },
                other => panic!("unexpected {other:?}"),
            }
            match &scenario.steps[2].step {
                Step::Verify { effect: Effect::All(all), options } => {
                    assert_eq!(all.len(), 3);
                    assert_eq!(options.timeout, Duration::from_millis(5000));
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn test_guarded_click_needs_strategies() {
            let yaml = GUARDED.replace("    strategies:\n      - css: \"#buybox-see-all-buying-choices\"\n", "");
            assert!(matches!(
                Playbook::from_yaml(&yaml),
                Err(PlaybookError::EmptyStrategies { .. })
            ));
        }

        #[test]
        fn test_empty_any_is_rejected() {
            let yaml = "version: \"1.0\"\nname: x\nsteps:\n  - id: v\n    type: verify\n    expect:\n      type: any\n      effects: []\n";
            assert!(matches!(Playbook::from_yaml(yaml), Err(PlaybookError::InvalidStep { .. })));
        }
    }
}
