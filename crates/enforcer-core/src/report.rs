//! Aggregate result of one engine run

use serde::Serialize;

use crate::error::StageFailure;
use crate::stage::{StageKind, StageResult};

/// Whether the engine was asked to repair or only to look
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Reconcile,
    Check,
}

/// The single completion signal of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Every enabled stage is healthy
    Healthy,
    /// The process is not elevated; the caller must relaunch and exit
    ElevationRequired,
    /// Check mode found this stage unhealthy
    Unhealthy { stage: StageKind },
    /// This stage could not be made healthy
    Failed { stage: StageKind },
}

impl Outcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Outcome::Healthy)
    }

    /// The stage the run stopped at, if any
    pub fn stage(&self) -> Option<StageKind> {
        match self {
            Outcome::Healthy => None,
            Outcome::ElevationRequired => Some(StageKind::Privilege),
            Outcome::Unhealthy { stage } | Outcome::Failed { stage } => Some(*stage),
        }
    }
}

/// Ordered stage results for one run
///
/// Built once by the engine and never changed afterwards. `results` stops at
/// the first stage that was not healthy; `skipped` lists stages disabled by
/// configuration.
#[derive(Debug, Serialize)]
pub struct ReconciliationReport {
    pub mode: Mode,
    pub results: Vec<StageResult>,
    pub skipped: Vec<StageKind>,
    pub outcome: Outcome,
}

impl ReconciliationReport {
    pub fn is_healthy(&self) -> bool {
        self.outcome.is_healthy()
    }

    pub fn result(&self, stage: StageKind) -> Option<&StageResult> {
        self.results.iter().find(|result| result.stage == stage)
    }

    /// The failure that ended the run, if it ended on one
    pub fn failure(&self) -> Option<&StageFailure> {
        self.results.iter().find_map(StageResult::failure)
    }

    /// Number of stages whose remediator was invoked
    pub fn remediations(&self) -> usize {
        self.results.iter().filter(|result| result.remediated).count()
    }

    /// Stages that were enabled but never reached because an earlier one stopped the run
    pub fn not_reached(&self) -> Vec<StageKind> {
        StageKind::ORDER
            .into_iter()
            .filter(|kind| !self.skipped.contains(kind) && self.result(*kind).is_none())
            .collect()
    }
}
