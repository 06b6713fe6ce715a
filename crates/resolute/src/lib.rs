//! Resolute: resilient UI locator and action engine for end-to-end browser tests
//!
//! Pages built by someone else change without notice. Resolute resolves each
//! step of a test through an ordered list of strategies instead of a single
//! selector, and reports a step as failed only when every fallback is spent.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐    ┌──────────────────┐    ┌────────────┐
//! │ Scenario / │    │ Engine           │    │ Driver     │
//! │ Playbook   │───►│ intent + strategy│───►│ (CDP/mock) │
//! │            │    │ list → Outcome   │    │            │
//! └────────────┘    └──────────────────┘    └────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use resolute::{Engine, Intent, MockDriver, MockNode, Strategy, StrategyList, ActOptions};
//!
//! let mut page = MockDriver::new("https://shop.test/");
//! let body = page.root();
//! let _ = page.append(body, MockNode::new("a").text("Customer Service"));
//!
//! let mut engine = Engine::new(page);
//! let strategies = StrategyList::of(Strategy::css("#nav-cs"))
//!     .then(Strategy::css("a").with_text(resolute::TextPattern::contains("Customer Service")));
//! let outcome = engine
//!     .locate_and_act(&Intent::click("Customer Service"), &strategies, &ActOptions::new().with_timeout_ms(0))
//!     .unwrap();
//! assert!(outcome.is_success());
//! ```

pub mod clock;
pub mod config;
pub mod driver;
mod effect;
mod engine;
pub mod flows;
mod intent;
pub mod mock;
mod overlay;
mod pattern;
pub mod playbook;
mod result;
mod scenario;
mod snapshot;
mod stepper;
mod strategy;
pub mod wait;

/// Chrome DevTools Protocol backend
#[cfg(feature = "browser")]
pub mod cdp;

pub use clock::{Clock, FakeClock, SharedClock, SystemClock};
pub use config::{ConfigError, CredentialSource, Credentials, EngineConfig};
pub use driver::{Cookie, Driver, DriverConfig};
pub use effect::Effect;
pub use engine::{Engine, Exhaustion, Outcome, Resolution, Target};
pub use intent::{FieldValue, Intent};
pub use mock::{MockDriver, MockNode, NodeId, Reaction};
pub use overlay::{OverlayGroup, OverlaySweep, SweepReport};
pub use pattern::TextPattern;
pub use playbook::{Playbook, PlaybookError};
pub use result::{ResoluteError, ResoluteResult};
pub use scenario::{
    ActStep, Scenario, ScenarioReport, ScenarioRunner, ScenarioStep, Step, StepRecord, StepStatus,
    DEFAULT_MAX_CLICKS,
};
pub use snapshot::{BoundingBox, ElementHandle, ElementRef, Snapshot};
pub use stepper::{parse_leading_int, read_number, Convergence, ConvergenceReport, DEFAULT_MAX_ITERATIONS, MAX_STEPS};
pub use strategy::{ActOptions, Selector, Strategy, StrategyList, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
pub use wait::{poll_until, wait_until, WaitOptions, WaitResult};

#[cfg(feature = "browser")]
pub use cdp::CdpDriver;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        ActOptions, ActStep, Convergence, Cookie, Driver, Effect, Engine, FieldValue, Intent, MockDriver, MockNode,
        Outcome, OverlaySweep, Reaction, ResoluteError, ResoluteResult, Scenario, ScenarioRunner, Selector, Step,
        Strategy, StrategyList, TextPattern,
    };
}
