//! Command implementations for enforcer-cli

pub mod init;
pub mod render;
pub mod run;

pub use init::run_init;
pub use run::{Relaunch, run_check, run_reconcile};

use enforcer_core::Outcome;

/// How the process ends after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Everything healthy, or the command had nothing to verify
    Success,
    /// A stage failed or was found unhealthy
    Failure,
    /// An elevated copy was launched and this instance must stop
    Relaunched,
}

impl Exit {
    pub fn code(self) -> i32 {
        match self {
            Exit::Success => 0,
            Exit::Failure => 1,
            Exit::Relaunched => 2,
        }
    }

    pub fn from_outcome(outcome: Outcome) -> Self {
        if outcome.is_healthy() {
            Exit::Success
        } else {
            Exit::Failure
        }
    }
}
