//! Bounded polling of a health probe
//!
//! The wait is driven by [`backoff::retry_notify`]: an unhealthy answer is a
//! transient error (sleep and retry), a probe error is permanent (stop and
//! propagate). [`FixedBudget`] supplies the fixed interval and caps the number
//! of evaluations.

use std::cell::Cell;
use std::time::Duration;

use crate::error::Error;
use crate::probe::Probe;

/// Interval and evaluation budget for one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Same interval, different budget
    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..self
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL, Self::DEFAULT_MAX_ATTEMPTS)
    }
}

/// A [`backoff::backoff::Backoff`] that allows exactly `max_attempts`
/// evaluations, sleeping `interval` between consecutive ones.
#[derive(Debug, Clone)]
pub struct FixedBudget {
    interval: Duration,
    remaining_sleeps: u32,
    max_sleeps: u32,
}

impl FixedBudget {
    pub fn new(policy: PollPolicy) -> Self {
        let max_sleeps = policy.max_attempts.saturating_sub(1);
        Self {
            interval: policy.interval,
            remaining_sleeps: max_sleeps,
            max_sleeps,
        }
    }
}

impl backoff::backoff::Backoff for FixedBudget {
    fn reset(&mut self) {
        self.remaining_sleeps = self.max_sleeps;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.remaining_sleeps == 0 {
            return None;
        }
        self.remaining_sleeps -= 1;
        Some(self.interval)
    }
}

/// Result of a completed wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// Whether the probe reported healthy before the budget ran out
    pub healthy: bool,
    /// Number of probe evaluations performed
    pub attempts: u32,
    /// Number of sleeps between evaluations
    pub sleeps: u32,
}

/// A probe error that ended the wait early
#[derive(Debug, thiserror::Error)]
#[error("probe failed on attempt {attempts}: {source}")]
pub struct PollFailure {
    pub attempts: u32,
    #[source]
    pub source: Error,
}

enum NotHealthy {
    Pending,
    Failed(Error),
}

/// Repeatedly evaluates a probe until it reports healthy or the budget is spent
///
/// Keeps a running count of every sleep it performed, across all waits, so
/// callers can observe how much time was spent polling.
#[derive(Debug, Default)]
pub struct StatePoller {
    total_sleeps: Cell<u32>,
}

impl StatePoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps performed by this poller so far
    pub fn total_sleeps(&self) -> u32 {
        self.total_sleeps.get()
    }

    /// Evaluate `probe` immediately, then after every `policy.interval`, for at
    /// most `policy.max_attempts` evaluations.
    ///
    /// An unhealthy answer is retried. A probe error ends the wait at once and
    /// is returned as [`PollFailure`]. A zero budget performs no evaluation.
    pub fn wait_until(
        &self,
        probe: &dyn Probe,
        policy: PollPolicy,
    ) -> std::result::Result<PollOutcome, PollFailure> {
        if policy.max_attempts == 0 {
            return Ok(PollOutcome {
                healthy: false,
                attempts: 0,
                sleeps: 0,
            });
        }

        let attempts = Cell::new(0u32);
        let sleeps = Cell::new(0u32);

        let operation = || {
            attempts.set(attempts.get() + 1);
            match probe.probe() {
                Ok(true) => Ok(()),
                Ok(false) => Err(backoff::Error::transient(NotHealthy::Pending)),
                Err(e) => Err(backoff::Error::permanent(NotHealthy::Failed(e))),
            }
        };
        let notify = |_: NotHealthy, wait: Duration| {
            sleeps.set(sleeps.get() + 1);
            tracing::debug!(attempt = attempts.get(), ?wait, "Not healthy yet, waiting");
        };

        let result = backoff::retry_notify(FixedBudget::new(policy), operation, notify);
        self.total_sleeps.set(self.total_sleeps.get() + sleeps.get());

        let outcome = |healthy| PollOutcome {
            healthy,
            attempts: attempts.get(),
            sleeps: sleeps.get(),
        };
        match result {
            Ok(()) => Ok(outcome(true)),
            Err(backoff::Error::Permanent(NotHealthy::Failed(source))) => Err(PollFailure {
                attempts: attempts.get(),
                source,
            }),
            Err(_) => Ok(outcome(false)),
        }
    }
}
