//! Polling primitives.
//!
//! All waiting is fixed-interval polling against fresh state, driven by an
//! injected [`Clock`]. A condition that already holds returns without sleeping.

use crate::clock::Clock;
use crate::result::{ResoluteError, ResoluteResult};
use crate::strategy::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use std::time::Duration;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for a polling wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Description used in timeout errors
    pub waited_for: String,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            waited_for: "condition".to_string(),
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Describe what is being waited for
    #[must_use]
    pub fn waiting_for(mut self, description: impl Into<String>) -> Self {
        self.waited_for = description.into();
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Successful wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult<T> {
    /// Value produced by the probe
    pub value: T,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of probe evaluations
    pub checks: u32,
}

// =============================================================================
// POLLING
// =============================================================================

/// Poll `probe` until it yields a value or the timeout elapses
///
/// The probe runs once before any sleep. Probe errors count as "not yet" and
/// the last one is folded into the timeout message.
///
/// # Errors
///
/// Returns [`ResoluteError::TimeoutExceeded`] if the probe never yields
pub fn poll_until<T, F>(clock: &dyn Clock, options: &WaitOptions, mut probe: F) -> ResoluteResult<WaitResult<T>>
where
    F: FnMut() -> ResoluteResult<Option<T>>,
{
    let start = clock.elapsed();
    let timeout = options.timeout();
    let mut checks = 0_u32;
    let mut last_error: Option<String> = None;

    loop {
        checks = checks.saturating_add(1);
        match probe() {
            Ok(Some(value)) => {
                return Ok(WaitResult {
                    value,
                    elapsed: clock.elapsed().saturating_sub(start),
                    checks,
                });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(error = %e, "probe failed, retrying");
                last_error = Some(e.to_string());
            }
        }

        let elapsed = clock.elapsed().saturating_sub(start);
        if elapsed >= timeout {
            break;
        }
        // A zero interval would never advance a virtual clock.
        let step = options.poll_interval().max(Duration::from_millis(1));
        clock.sleep(step.min(timeout - elapsed));
    }

    let waited_for = match last_error {
        Some(e) => format!("{} (last error: {e})", options.waited_for),
        None => options.waited_for.clone(),
    };
    Err(ResoluteError::TimeoutExceeded {
        waited_for,
        ms: options.timeout_ms,
    })
}

/// Poll a boolean condition
///
/// # Errors
///
/// Returns [`ResoluteError::TimeoutExceeded`] if the condition never holds
pub fn wait_until<F>(clock: &dyn Clock, options: &WaitOptions, mut condition: F) -> ResoluteResult<Duration>
where
    F: FnMut() -> bool,
{
    poll_until(clock, options, || Ok(condition().then_some(()))).map(|r| r.elapsed)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;

    mod options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let o = WaitOptions::default();
            assert_eq!(o.timeout_ms, DEFAULT_TIMEOUT_MS);
            assert_eq!(o.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        }

        #[test]
        fn test_durations() {
            let o = WaitOptions::new().with_timeout(1500).with_poll_interval(50);
            assert_eq!(o.timeout(), Duration::from_millis(1500));
            assert_eq!(o.poll_interval(), Duration::from_millis(50));
        }
    }

    mod poll_tests {
        use super::*;

        #[test]
        fn test_immediate_success_does_not_sleep() {
            let clock = FakeClock::new();
            let r = poll_until(&clock, &WaitOptions::new(), || Ok(Some(7))).unwrap();
            assert_eq!(r.value, 7);
            assert_eq!(r.checks, 1);
            assert_eq!(r.elapsed, Duration::ZERO);
            assert_eq!(clock.sleep_count(), 0);
        }

        #[test]
        fn test_succeeds_after_polls() {
            let clock = FakeClock::new();
            let mut n = 0;
            let r = poll_until(&clock, &WaitOptions::new().with_poll_interval(100), || {
                n += 1;
                Ok((n == 4).then_some(n))
            })
            .unwrap();
            assert_eq!(r.value, 4);
            assert_eq!(r.elapsed, Duration::from_millis(300));
            assert_eq!(clock.sleep_count(), 3);
        }

        #[test]
        fn test_timeout_error() {
            let clock = FakeClock::new();
            let options = WaitOptions::new()
                .with_timeout(1000)
                .with_poll_interval(100)
                .waiting_for("spinner gone");
            let err = poll_until::<(), _>(&clock, &options, || Ok(None)).unwrap_err();
            match err {
                ResoluteError::TimeoutExceeded { waited_for, ms } => {
                    assert_eq!(waited_for, "spinner gone");
                    assert_eq!(ms, 1000);
                }
                other => panic!("unexpected {other:?}"),
            }
            assert_eq!(clock.now_ms(), 1000);
        }

        #[test]
        fn test_probe_errors_absorbed_and_reported() {
            let clock = FakeClock::new();
            let options = WaitOptions::new().with_timeout(300).waiting_for("badge");
            let err = poll_until::<(), _>(&clock, &options, || Err(ResoluteError::driver("query", "detached"))).unwrap_err();
            assert!(err.to_string().contains("detached"));
        }

        #[test]
        fn test_zero_timeout_checks_once() {
            let clock = FakeClock::new();
            let mut calls = 0;
            let _ = poll_until::<(), _>(&clock, &WaitOptions::new().with_timeout(0), || {
                calls += 1;
                Ok(None)
            });
            assert_eq!(calls, 1);
            assert_eq!(clock.sleep_count(), 0);
        }

        #[test]
        fn test_wait_until_bool() {
            let clock = FakeClock::new();
            let mut n = 0;
            let elapsed = wait_until(&clock, &WaitOptions::new().with_poll_interval(10), || {
                n += 1;
                n > 2
            })
            .unwrap();
            assert_eq!(elapsed, Duration::from_millis(20));
        }
    }
}
