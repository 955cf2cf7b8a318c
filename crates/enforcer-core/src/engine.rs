//! The reconciliation engine
//!
//! Runs the health stages strictly in dependency order:
//!
//! 1. privilege
//! 2. installation presence
//! 3. service auto-start configuration
//! 4. service running
//! 5. process running
//! 6. connectivity
//!
//! The first stage that does not end healthy stops the run. Nothing is rolled
//! back: a service started by an earlier stage stays running.

use enforcer_fs::FileSystem;
use enforcer_sys::{CommandRunner, Elevation, ProcessTable, ServiceManager};

use crate::config::{EnforcerConfig, StageToggles};
use crate::poller::{PollPolicy, StatePoller};
use crate::probe::{
    ConnectivityProbe, InstallationProbe, PrivilegeProbe, ProcessRunningProbe,
    ServiceAutoStartProbe, ServiceRunningProbe,
};
use crate::remediate::{ConfigureAutoStart, ConnectDependency, StartProcess, StartService};
use crate::report::{Mode, Outcome, ReconciliationReport};
use crate::session::ServiceSession;
use crate::stage::{Remedy, Stage, StageKind, StageStatus};
use crate::target::TargetDescriptor;

/// Host collaborators the stages act through
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub elevation: &'a dyn Elevation,
    pub fs: &'a dyn FileSystem,
    pub processes: &'a dyn ProcessTable,
    pub services: &'a dyn ServiceManager,
    pub commands: &'a dyn CommandRunner,
}

/// Drives the target to a healthy state, stage by stage
pub struct ReconciliationEngine<'a> {
    target: TargetDescriptor,
    policy: PollPolicy,
    toggles: StageToggles,
    collaborators: Collaborators<'a>,
    poller: StatePoller,
}

impl<'a> ReconciliationEngine<'a> {
    /// Engine with the default poll policy and every stage enabled
    pub fn new(target: TargetDescriptor, collaborators: Collaborators<'a>) -> Self {
        Self {
            target,
            policy: PollPolicy::default(),
            toggles: StageToggles::default(),
            collaborators,
            poller: StatePoller::new(),
        }
    }

    pub fn from_config(config: &EnforcerConfig, collaborators: Collaborators<'a>) -> Self {
        Self::new(config.target.clone(), collaborators)
            .with_policy(config.poll_policy())
            .with_stages(config.stages)
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_stages(mut self, toggles: StageToggles) -> Self {
        self.toggles = toggles;
        self
    }

    pub fn target(&self) -> &TargetDescriptor {
        &self.target
    }

    pub fn poller(&self) -> &StatePoller {
        &self.poller
    }

    /// Enabled stages, in run order
    pub fn plan(&self) -> Vec<StageKind> {
        StageKind::ORDER
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }

    /// Probe, remediate and poll every enabled stage until one fails
    pub fn run(&self) -> ReconciliationReport {
        self.execute(Mode::Reconcile)
    }

    /// Probe every enabled stage once, without remediation
    pub fn check(&self) -> ReconciliationReport {
        self.execute(Mode::Check)
    }

    fn is_enabled(&self, kind: StageKind) -> bool {
        match kind {
            StageKind::Privilege | StageKind::Installation => true,
            StageKind::ServiceAutoStart | StageKind::ServiceRunning => self.toggles.service,
            StageKind::ProcessRunning => self.toggles.process,
            StageKind::Connectivity => self.toggles.connectivity,
        }
    }

    fn execute(&self, mode: Mode) -> ReconciliationReport {
        let plan = self.plan();
        let skipped: Vec<StageKind> = StageKind::ORDER
            .into_iter()
            .filter(|kind| !plan.contains(kind))
            .collect();
        tracing::info!(?mode, stages = plan.len(), skipped = skipped.len(), "Starting");

        let session = ServiceSession::new(self.collaborators.services, &self.target.service_name);
        let mut results = Vec::with_capacity(plan.len());
        let mut outcome = Outcome::Healthy;

        for (index, kind) in plan.iter().copied().enumerate() {
            let stage = self.build_stage(kind, &session);
            let result = match mode {
                Mode::Reconcile => stage.ensure(&self.poller),
                Mode::Check => stage.inspect(),
            };

            if !plan.get(index + 1).is_some_and(StageKind::uses_service) {
                session.close();
            }

            let stop = match result.status {
                StageStatus::Healthy => None,
                StageStatus::Unhealthy => Some(Outcome::Unhealthy { stage: kind }),
                StageStatus::RelaunchRequired => Some(Outcome::ElevationRequired),
                StageStatus::Failed(_) => Some(Outcome::Failed { stage: kind }),
            };
            results.push(result);
            if let Some(stop) = stop {
                outcome = stop;
                break;
            }
        }
        session.close();

        match outcome {
            Outcome::Healthy => tracing::info!("All stages healthy"),
            Outcome::ElevationRequired => tracing::warn!("Stopped: elevation required"),
            Outcome::Unhealthy { stage } => tracing::warn!(%stage, "Stopped: unhealthy"),
            Outcome::Failed { stage } => tracing::error!(%stage, "Stopped: failed"),
        }

        ReconciliationReport {
            mode,
            results,
            skipped,
            outcome,
        }
    }

    fn build_stage<'s>(&'s self, kind: StageKind, session: &'s ServiceSession<'s>) -> Stage<'s> {
        let target = &self.target;
        let c = self.collaborators;
        let policy = self.policy;

        match kind {
            StageKind::Privilege => {
                Stage::new(kind, PrivilegeProbe::new(c.elevation), Remedy::Relaunch, policy)
            }
            StageKind::Installation => Stage::new(
                kind,
                InstallationProbe::new(c.fs, target),
                Remedy::Unavailable {
                    detail: self.not_installed_detail(),
                },
                policy,
            ),
            StageKind::ServiceAutoStart => Stage::new(
                kind,
                ServiceAutoStartProbe::new(session),
                Remedy::Action(Box::new(ConfigureAutoStart::new(session))),
                policy,
            ),
            StageKind::ServiceRunning => Stage::new(
                kind,
                ServiceRunningProbe::new(session),
                Remedy::Action(Box::new(StartService::new(session))),
                policy,
            ),
            StageKind::ProcessRunning => Stage::new(
                kind,
                ProcessRunningProbe::new(c.processes, &target.gui_executable),
                Remedy::Action(Box::new(StartProcess::new(c.processes, target.gui_path()))),
                policy,
            ),
            StageKind::Connectivity => Stage::new(
                kind,
                ConnectivityProbe::new(c.commands, &target.cli),
                Remedy::Action(Box::new(ConnectDependency::new(c.commands, &target.cli))),
                policy,
            ),
        }
    }

    fn not_installed_detail(&self) -> String {
        let mut detail = format!("not installed in '{}'", self.target.install_dir.display());
        if let Some(hint) = &self.target.install_hint {
            detail.push_str("; ");
            detail.push_str(hint);
        }
        detail
    }
}
