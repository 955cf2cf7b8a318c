//! One health dimension: a probe, a remedy and a poll policy

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::StageFailure;
use crate::poller::{PollPolicy, StatePoller};
use crate::probe::Probe;
use crate::remediate::{Remediation, Remediator};

/// The health dimensions, in dependency order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Privilege,
    Installation,
    ServiceAutoStart,
    ServiceRunning,
    ProcessRunning,
    Connectivity,
}

impl StageKind {
    /// Every stage, in the order the engine runs them
    pub const ORDER: [StageKind; 6] = [
        StageKind::Privilege,
        StageKind::Installation,
        StageKind::ServiceAutoStart,
        StageKind::ServiceRunning,
        StageKind::ProcessRunning,
        StageKind::Connectivity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Privilege => "privilege",
            StageKind::Installation => "installation",
            StageKind::ServiceAutoStart => "service auto-start",
            StageKind::ServiceRunning => "service running",
            StageKind::ProcessRunning => "process running",
            StageKind::Connectivity => "connectivity",
        }
    }

    /// Whether the stage talks to the service manager
    pub fn uses_service(&self) -> bool {
        matches!(self, StageKind::ServiceAutoStart | StageKind::ServiceRunning)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a stage recovers from an unhealthy probe
pub enum Remedy<'a> {
    /// Nothing this process can do; the stage fails at once
    Unavailable { detail: String },
    /// The process must be restarted with elevated rights
    Relaunch,
    /// Run the remediator once, then poll
    Action(Box<dyn Remediator + 'a>),
}

impl fmt::Debug for Remedy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Remedy::Unavailable { detail } => {
                f.debug_struct("Unavailable").field("detail", detail).finish()
            }
            Remedy::Relaunch => f.write_str("Relaunch"),
            Remedy::Action(_) => f.write_str("Action(..)"),
        }
    }
}

/// Final state of one stage
#[derive(Debug)]
pub enum StageStatus {
    Healthy,
    /// Probed once without remediation and found unhealthy (check mode only)
    Unhealthy,
    /// Healthy only after an elevated relaunch; the run ends here
    RelaunchRequired,
    Failed(StageFailure),
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Healthy => "healthy",
            StageStatus::Unhealthy => "unhealthy",
            StageStatus::RelaunchRequired => "relaunch_required",
            StageStatus::Failed(_) => "failed",
        }
    }
}

/// Outcome of one [`Stage::ensure`] or [`Stage::inspect`] call
#[derive(Debug)]
pub struct StageResult {
    pub stage: StageKind,
    pub status: StageStatus,
    /// Probe evaluations performed, never more than the stage's budget
    pub attempts: u32,
    /// Whether a remediator was invoked
    pub remediated: bool,
}

impl StageResult {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status, StageStatus::Healthy)
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        match &self.status {
            StageStatus::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl Serialize for StageResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("StageResult", 5)?;
        state.serialize_field("stage", &self.stage)?;
        state.serialize_field("status", self.status.as_str())?;
        state.serialize_field("attempts", &self.attempts)?;
        state.serialize_field("remediated", &self.remediated)?;
        state.serialize_field("error", &self.failure().map(ToString::to_string))?;
        state.end()
    }
}

/// A probe bound to its remedy and poll policy
pub struct Stage<'a> {
    kind: StageKind,
    probe: Box<dyn Probe + 'a>,
    remedy: Remedy<'a>,
    policy: PollPolicy,
}

impl<'a> Stage<'a> {
    pub fn new(
        kind: StageKind,
        probe: impl Probe + 'a,
        remedy: Remedy<'a>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            kind,
            probe: Box::new(probe),
            remedy,
            policy,
        }
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// Bring this dimension to healthy, or report why it could not be
    ///
    /// Probes once. When unhealthy, applies the remedy exactly once and polls
    /// the same probe with what is left of the budget. The first probe counts
    /// against the budget, so the probe runs at most `max_attempts` times.
    pub fn ensure(&self, poller: &StatePoller) -> StageResult {
        let healthy = match self.probe.probe() {
            Ok(healthy) => healthy,
            Err(source) => {
                let failure = StageFailure::ProbeFailed {
                    stage: self.kind,
                    source,
                };
                return self.failed(failure, 1, false);
            }
        };
        if healthy {
            tracing::info!(stage = %self.kind, "Healthy");
            return self.result(StageStatus::Healthy, 1, false);
        }

        let remediator = match &self.remedy {
            Remedy::Unavailable { detail } => {
                let failure = StageFailure::DependencyAbsent {
                    stage: self.kind,
                    detail: detail.clone(),
                };
                return self.failed(failure, 1, false);
            }
            Remedy::Relaunch => {
                tracing::warn!(stage = %self.kind, "Elevated relaunch required");
                return self.result(StageStatus::RelaunchRequired, 1, false);
            }
            Remedy::Action(remediator) => remediator,
        };

        tracing::warn!(stage = %self.kind, "Unhealthy, remediating");
        match remediator.remediate() {
            Ok(Remediation::Applied) => {}
            Ok(Remediation::Pending) => {
                tracing::debug!(stage = %self.kind, "Remediation pending, awaiting confirmation");
            }
            Err(source) => {
                let failure = StageFailure::RemediationFailed {
                    stage: self.kind,
                    source,
                };
                return self.failed(failure, 1, true);
            }
        }

        let remaining = self
            .policy
            .with_max_attempts(self.policy.max_attempts.saturating_sub(1));
        match poller.wait_until(self.probe.as_ref(), remaining) {
            Ok(outcome) if outcome.healthy => {
                let attempts = 1 + outcome.attempts;
                tracing::info!(stage = %self.kind, attempts, "Healthy after remediation");
                self.result(StageStatus::Healthy, attempts, true)
            }
            Ok(outcome) => {
                let attempts = 1 + outcome.attempts;
                let failure = StageFailure::BudgetExhausted {
                    stage: self.kind,
                    attempts,
                };
                self.failed(failure, attempts, true)
            }
            Err(poll_failure) => {
                let failure = StageFailure::ProbeFailed {
                    stage: self.kind,
                    source: poll_failure.source,
                };
                self.failed(failure, 1 + poll_failure.attempts, true)
            }
        }
    }

    /// Probe once without remediating
    pub fn inspect(&self) -> StageResult {
        match self.probe.probe() {
            Ok(true) => self.result(StageStatus::Healthy, 1, false),
            Ok(false) => self.result(StageStatus::Unhealthy, 1, false),
            Err(source) => {
                let failure = StageFailure::ProbeFailed {
                    stage: self.kind,
                    source,
                };
                self.failed(failure, 1, false)
            }
        }
    }

    fn result(&self, status: StageStatus, attempts: u32, remediated: bool) -> StageResult {
        StageResult {
            stage: self.kind,
            status,
            attempts,
            remediated,
        }
    }

    fn failed(&self, failure: StageFailure, attempts: u32, remediated: bool) -> StageResult {
        tracing::error!(stage = %self.kind, "{failure}");
        self.result(StageStatus::Failed(failure), attempts, remediated)
    }
}

impl fmt::Debug for Stage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("kind", &self.kind)
            .field("remedy", &self.remedy)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use std::cell::Cell;
    use std::time::Duration;

    fn fast(max_attempts: u32) -> PollPolicy {
        PollPolicy::new(Duration::ZERO, max_attempts)
    }

    #[test]
    fn test_stage_kind_order_is_sorted() {
        let mut sorted = StageKind::ORDER;
        sorted.sort();
        assert_eq!(sorted, StageKind::ORDER);
    }

    #[test]
    fn test_healthy_first_probe_skips_remedy() {
        let probes = Cell::new(0);
        let remedies = Cell::new(0);
        let probe = || -> Result<bool> {
            probes.set(probes.get() + 1);
            Ok(true)
        };
        let remedy = || -> Result<Remediation> {
            remedies.set(remedies.get() + 1);
            Ok(Remediation::Applied)
        };
        let stage = Stage::new(
            StageKind::ProcessRunning,
            probe,
            Remedy::Action(Box::new(remedy)),
            fast(20),
        );
        let poller = StatePoller::new();

        let result = stage.ensure(&poller);

        assert!(result.is_healthy());
        assert!(!result.remediated);
        assert_eq!(result.attempts, 1);
        assert_eq!(probes.get(), 1);
        assert_eq!(remedies.get(), 0);
        assert_eq!(poller.total_sleeps(), 0);
    }

    #[test]
    fn test_remedy_then_poll_until_healthy() {
        let probes = Cell::new(0);
        let remedies = Cell::new(0);
        let probe = || -> Result<bool> {
            probes.set(probes.get() + 1);
            Ok(probes.get() >= 4)
        };
        let remedy = || -> Result<Remediation> {
            remedies.set(remedies.get() + 1);
            Ok(Remediation::Applied)
        };
        let stage = Stage::new(
            StageKind::ServiceRunning,
            probe,
            Remedy::Action(Box::new(remedy)),
            fast(20),
        );

        let result = stage.ensure(&StatePoller::new());

        assert!(result.is_healthy());
        assert!(result.remediated);
        assert_eq!(result.attempts, 4);
        assert_eq!(remedies.get(), 1);
    }

    #[test]
    fn test_budget_exhausted_after_single_remedy() {
        let probes = Cell::new(0);
        let remedies = Cell::new(0);
        let probe = || -> Result<bool> {
            probes.set(probes.get() + 1);
            Ok(false)
        };
        let remedy = || -> Result<Remediation> {
            remedies.set(remedies.get() + 1);
            Ok(Remediation::Pending)
        };
        let stage = Stage::new(
            StageKind::Connectivity,
            probe,
            Remedy::Action(Box::new(remedy)),
            fast(7),
        );

        let result = stage.ensure(&StatePoller::new());

        assert_eq!(remedies.get(), 1);
        assert_eq!(probes.get(), 7);
        assert_eq!(result.attempts, 7);
        let failure = result.failure().unwrap();
        assert!(failure.is_timeout());
        assert_eq!(failure.stage(), StageKind::Connectivity);
    }

    #[test]
    fn test_unavailable_remedy_fails_without_polling() {
        let probes = Cell::new(0);
        let probe = || -> Result<bool> {
            probes.set(probes.get() + 1);
            Ok(false)
        };
        let remedy = Remedy::Unavailable {
            detail: "not installed".to_string(),
        };
        let stage = Stage::new(StageKind::Installation, probe, remedy, fast(20));
        let poller = StatePoller::new();

        let result = stage.ensure(&poller);

        assert_eq!(probes.get(), 1);
        assert_eq!(poller.total_sleeps(), 0);
        assert!(matches!(
            result.failure(),
            Some(StageFailure::DependencyAbsent { stage: StageKind::Installation, .. })
        ));
    }

    #[test]
    fn test_relaunch_remedy() {
        let probe = || -> Result<bool> { Ok(false) };
        let stage = Stage::new(StageKind::Privilege, probe, Remedy::Relaunch, fast(20));

        let result = stage.ensure(&StatePoller::new());

        assert!(matches!(result.status, StageStatus::RelaunchRequired));
        assert!(!result.remediated);
    }

    #[test]
    fn test_probe_error_is_fatal() {
        let remedies = Cell::new(0);
        let remedy = || -> Result<Remediation> {
            remedies.set(remedies.get() + 1);
            Ok(Remediation::Applied)
        };
        let probe = || -> Result<bool> { Err(Error::invalid_config("cannot enumerate")) };
        let stage = Stage::new(
            StageKind::ProcessRunning,
            probe,
            Remedy::Action(Box::new(remedy)),
            fast(20),
        );

        let result = stage.ensure(&StatePoller::new());

        assert_eq!(remedies.get(), 0);
        assert!(matches!(result.failure(), Some(StageFailure::ProbeFailed { .. })));
    }

    #[test]
    fn test_remediation_error_is_fatal() {
        let probes = Cell::new(0);
        let probe = || -> Result<bool> {
            probes.set(probes.get() + 1);
            Ok(false)
        };
        let remedy = || -> Result<Remediation> { Err(Error::invalid_config("rejected")) };
        let stage = Stage::new(
            StageKind::ServiceAutoStart,
            probe,
            Remedy::Action(Box::new(remedy)),
            fast(20),
        );

        let result = stage.ensure(&StatePoller::new());

        assert_eq!(probes.get(), 1);
        assert!(result.remediated);
        assert!(matches!(result.failure(), Some(StageFailure::RemediationFailed { .. })));
    }

    #[test]
    fn test_single_attempt_budget_still_remediates_once() {
        let probes = Cell::new(0);
        let probe = || -> Result<bool> {
            probes.set(probes.get() + 1);
            Ok(false)
        };
        let stage = Stage::new(
            StageKind::ProcessRunning,
            probe,
            Remedy::Action(Box::new(|| -> Result<Remediation> { Ok(Remediation::Applied) })),
            fast(1),
        );

        let result = stage.ensure(&StatePoller::new());

        assert_eq!(probes.get(), 1);
        assert_eq!(result.attempts, 1);
        assert!(result.failure().unwrap().is_timeout());
    }

    #[test]
    fn test_inspect_never_remediates() {
        let remedies = Cell::new(0);
        let remedy = || -> Result<Remediation> {
            remedies.set(remedies.get() + 1);
            Ok(Remediation::Applied)
        };
        let stage = Stage::new(
            StageKind::ServiceRunning,
            || -> Result<bool> { Ok(false) },
            Remedy::Action(Box::new(remedy)),
            fast(20),
        );

        let result = stage.inspect();

        assert!(matches!(result.status, StageStatus::Unhealthy));
        assert_eq!(remedies.get(), 0);
    }

    #[test]
    fn test_result_serializes_error_text() {
        let result = StageResult {
            stage: StageKind::Connectivity,
            status: StageStatus::Failed(StageFailure::BudgetExhausted {
                stage: StageKind::Connectivity,
                attempts: 20,
            }),
            attempts: 20,
            remediated: true,
        };

        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["stage"], "connectivity");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "connectivity: still unhealthy after 20 attempts");
    }
}
