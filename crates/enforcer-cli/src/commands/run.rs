//! Run and check command implementations

use std::ffi::OsString;

use colored::Colorize;
use enforcer_core::{Collaborators, EnforcerConfig, Outcome, ReconciliationEngine};

use super::Exit;
use super::render::{print_report, render_header};
use crate::cli::ELEVATED_FLAG;
use crate::error::{CliError, Result};

/// How this instance was started, as far as an elevated relaunch cares
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relaunch {
    /// Arguments to hand the elevated copy, without the program name
    pub args: Vec<OsString>,
    /// This instance is already the elevated copy of an earlier one
    pub elevated_copy: bool,
}

impl Relaunch {
    /// Arguments of the running process
    pub fn from_env(elevated_copy: bool) -> Self {
        Self {
            args: std::env::args_os().skip(1).collect(),
            elevated_copy,
        }
    }

    /// Arguments for the elevated copy, marked so it never relaunches again
    pub fn child_args(&self) -> Vec<OsString> {
        let mut args = self.args.clone();
        if !args.iter().any(|arg| arg == ELEVATED_FLAG) {
            args.push(OsString::from(ELEVATED_FLAG));
        }
        args
    }
}

/// Run the reconciliation: probe, repair and confirm every enabled stage
///
/// When the process lacks administrator rights it relaunches itself elevated
/// with the same arguments and reports [`Exit::Relaunched`]. An instance that
/// is already the relaunched copy fails instead.
pub fn run_reconcile(
    host: Collaborators<'_>,
    config: &EnforcerConfig,
    json: bool,
    relaunch: &Relaunch,
) -> Result<Exit> {
    let engine = ReconciliationEngine::from_config(config, host);

    if !json {
        println!("{}", render_header("Reconciling", &config.target));
    }
    let report = engine.run();
    print_report(&report, json)?;

    if report.outcome == Outcome::ElevationRequired {
        if relaunch.elevated_copy {
            return Err(CliError::user(
                "Still lacking administrator rights after an elevated relaunch",
            ));
        }
        host.elevation.relaunch_elevated(&relaunch.child_args())?;
        if !json {
            println!(
                "{} Relaunched with administrator rights; this window can be closed.",
                "=>".blue().bold()
            );
        }
        return Ok(Exit::Relaunched);
    }

    Ok(Exit::from_outcome(report.outcome))
}

/// Probe every enabled stage once and report, changing nothing
pub fn run_check(host: Collaborators<'_>, config: &EnforcerConfig, json: bool) -> Result<Exit> {
    let engine = ReconciliationEngine::from_config(config, host);

    if !json {
        println!("{}", render_header("Checking", &config.target));
    }
    let report = engine.check();
    print_report(&report, json)?;

    Ok(Exit::from_outcome(report.outcome))
}
