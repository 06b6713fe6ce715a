//! Numeric convergence: drive a counter up to a target one click at a time.
//!
//! The loop reads the value, stops once it is at or above the target, and
//! otherwise clicks the increment control once, waits for any settle
//! indicator to disappear, and reads again. It only ever increments, and the
//! iteration bound is always greater than the number of steps the starting
//! value needs. Landing above the target is accepted. A target more than
//! [`MAX_STEPS`] away is reported as missed without clicking.

use crate::driver::Driver;
use crate::engine::{millis, Engine, Outcome};
use crate::intent::Intent;
use crate::result::{ResoluteError, ResoluteResult};
use crate::snapshot::ElementHandle;
use crate::strategy::{ActOptions, Selector, StrategyList};
use crate::wait::WaitOptions;
use serde::Serialize;

/// Default iteration bound before auto-raising
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Largest distance to the target that stepping will attempt
pub const MAX_STEPS: u32 = 1_000;

/// Parse a leading integer the way `parseInt` does: optional sign, then
/// digits, after trimming; anything after the digits is ignored
#[must_use]
pub fn parse_leading_int(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let magnitude: i64 = rest[..digits].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Integer shown by an element; unparsable reads as 0
#[must_use]
pub fn read_number(element: &ElementHandle) -> i64 {
    parse_leading_int(&element.text)
        .or_else(|| element.value.as_deref().and_then(parse_leading_int))
        .unwrap_or(0)
}

/// A counter to drive up to a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convergence {
    /// Semantic label of the counter
    pub label: String,
    /// Where to read the current value
    pub reader: StrategyList,
    /// The increment control
    pub increment: StrategyList,
    /// Value to reach
    pub target: i64,
    /// Iteration bound; raised to `steps_needed + 1` when lower
    pub max_iterations: u32,
    /// Indicator that must disappear after each increment
    pub settle: Option<Selector>,
    /// Options for each read and click
    pub options: ActOptions,
}

impl Convergence {
    /// Create a convergence with default bound and options
    #[must_use]
    pub fn new(label: impl Into<String>, reader: StrategyList, increment: StrategyList, target: i64) -> Self {
        Self {
            label: label.into(),
            reader,
            increment,
            target,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            settle: None,
            options: ActOptions::default(),
        }
    }

    /// Set the iteration bound
    #[must_use]
    pub const fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Wait for `selector` to disappear after each increment
    #[must_use]
    pub fn with_settle(mut self, selector: Selector) -> Self {
        self.settle = Some(selector);
        self
    }

    /// Set per-action options
    #[must_use]
    pub fn with_options(mut self, options: ActOptions) -> Self {
        self.options = options;
        self
    }

    /// Increments needed from `initial`, saturating at `u32::MAX`
    #[must_use]
    pub fn steps_needed(&self, initial: i64) -> u32 {
        u32::try_from(self.target.saturating_sub(initial).max(0)).unwrap_or(u32::MAX)
    }

    /// Effective bound for a starting value
    #[must_use]
    pub fn bound_for(&self, initial: i64) -> u32 {
        self.max_iterations.max(self.steps_needed(initial).saturating_add(1))
    }
}

/// What a convergence run did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvergenceReport {
    /// Semantic label of the counter
    pub label: String,
    /// Wanted value
    pub target: i64,
    /// First reading
    pub initial: i64,
    /// Last reading
    pub final_value: i64,
    /// Increment clicks performed
    pub increments: u32,
    /// Effective iteration bound
    pub bound: u32,
    /// Whether `final_value >= target`
    pub reached: bool,
    /// Every reading, in order
    pub readings: Vec<i64>,
}

impl ConvergenceReport {
    /// Escalate a missed target
    ///
    /// # Errors
    ///
    /// Returns [`ResoluteError::ConvergenceNotReached`] if the target was missed
    pub fn into_result(self) -> ResoluteResult<Self> {
        if self.reached {
            Ok(self)
        } else {
            Err(ResoluteError::ConvergenceNotReached {
                target_label: self.label,
                target: self.target,
                reached: self.final_value,
                iterations: self.increments,
            })
        }
    }
}

impl<D: Driver> Engine<D> {
    /// Drive a counter to its target
    ///
    /// # Errors
    ///
    /// Returns error if the counter or the increment control cannot be resolved
    pub fn converge(&mut self, convergence: &Convergence) -> ResoluteResult<ConvergenceReport> {
        let initial = self.read_counter_value(convergence)?;
        let bound = convergence.bound_for(initial);
        if convergence.steps_needed(initial) > MAX_STEPS {
            tracing::warn!(
                label = %convergence.label,
                initial,
                target = convergence.target,
                "target out of stepping range"
            );
            return Ok(ConvergenceReport {
                label: convergence.label.clone(),
                target: convergence.target,
                initial,
                final_value: initial,
                increments: 0,
                bound,
                reached: false,
                readings: vec![initial],
            });
        }
        let forced = convergence.options.clone().with_force(true);
        let click = Intent::click(format!("increase {}", convergence.label));

        let mut readings = vec![initial];
        let mut current = initial;
        let mut increments = 0_u32;

        while current < convergence.target && increments < bound {
            self.locate_and_act(&click, &convergence.increment, &forced)?
                .into_result()?;
            increments += 1;

            if let Some(settle) = &convergence.settle {
                self.await_settled(settle, &convergence.options);
            }

            let next = self.read_counter_value(convergence)?;
            if next < current {
                tracing::warn!(label = %convergence.label, from = current, to = next, "counter went down");
            }
            readings.push(next);
            current = next;
        }

        let reached = current >= convergence.target;
        tracing::info!(
            label = %convergence.label,
            initial,
            final_value = current,
            target = convergence.target,
            increments,
            reached,
            "convergence finished"
        );
        Ok(ConvergenceReport {
            label: convergence.label.clone(),
            target: convergence.target,
            initial,
            final_value: current,
            increments,
            bound,
            reached,
            readings,
        })
    }

    fn read_counter_value(&mut self, convergence: &Convergence) -> ResoluteResult<i64> {
        let intent = Intent::read_number(convergence.label.clone());
        match self.locate_and_act(&intent, &convergence.reader, &convergence.options)? {
            Outcome::Succeeded(r) => Ok(r.reading.unwrap_or(0)),
            other => other.into_result().map(|_| 0),
        }
    }

    fn await_settled(&self, settle: &Selector, options: &ActOptions) {
        let wait = WaitOptions::new()
            .with_timeout(millis(options.timeout))
            .with_poll_interval(millis(options.poll_interval))
            .waiting_for(format!("{settle} to disappear"));
        let settled = self.poll_until(&wait, |driver| {
            let found = driver.query_all(settle)?;
            Ok((!found.iter().any(ElementHandle::is_visible)).then_some(()))
        });
        if let Err(e) = settled {
            tracing::warn!(error = %e, "settle indicator still visible, reading anyway");
        }
    }
}
