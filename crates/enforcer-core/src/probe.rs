//! Read-only health probes, one per health dimension
//!
//! A probe answers a single yes/no question about the host and never changes
//! it. `Ok(false)` means "not healthy (yet)" and drives polling; `Err` means
//! the question itself could not be answered.

use enforcer_fs::FileSystem;
use enforcer_sys::{CommandRunner, Elevation, ProcessTable, ServiceState, StartType};

use crate::error::{Error, Result};
use crate::session::ServiceSession;
use crate::target::{CliCommands, TargetDescriptor};

/// A read-only health predicate
pub trait Probe {
    fn probe(&self) -> Result<bool>;
}

impl<F> Probe for F
where
    F: Fn() -> Result<bool>,
{
    fn probe(&self) -> Result<bool> {
        self()
    }
}

/// Whether the current process runs with administrator rights
pub struct PrivilegeProbe<'a> {
    elevation: &'a dyn Elevation,
}

impl<'a> PrivilegeProbe<'a> {
    pub fn new(elevation: &'a dyn Elevation) -> Self {
        Self { elevation }
    }
}

impl Probe for PrivilegeProbe<'_> {
    fn probe(&self) -> Result<bool> {
        Ok(self.elevation.is_elevated())
    }
}

/// Whether the install directory and both executables exist
pub struct InstallationProbe<'a> {
    fs: &'a dyn FileSystem,
    target: &'a TargetDescriptor,
}

impl<'a> InstallationProbe<'a> {
    pub fn new(fs: &'a dyn FileSystem, target: &'a TargetDescriptor) -> Self {
        Self { fs, target }
    }
}

impl Probe for InstallationProbe<'_> {
    fn probe(&self) -> Result<bool> {
        if !self.fs.dir_exists(&self.target.install_dir)? {
            tracing::debug!(dir = %self.target.install_dir.display(), "Install directory missing");
            return Ok(false);
        }
        for path in [self.target.gui_path(), self.target.service_path()] {
            if !self.fs.file_exists(&path)? {
                tracing::debug!(path = %path.display(), "Executable missing");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Whether the service's persisted start type is automatic
pub struct ServiceAutoStartProbe<'a> {
    session: &'a ServiceSession<'a>,
}

impl<'a> ServiceAutoStartProbe<'a> {
    pub fn new(session: &'a ServiceSession<'a>) -> Self {
        Self { session }
    }
}

impl Probe for ServiceAutoStartProbe<'_> {
    fn probe(&self) -> Result<bool> {
        self.session.with(|service| {
            let config = service.config()?;
            tracing::trace!(
                service = service.name(),
                start_type = %config.start_type,
                "Queried start type"
            );
            Ok(config.start_type == StartType::Automatic)
        })
    }
}

/// Whether the service is currently running
pub struct ServiceRunningProbe<'a> {
    session: &'a ServiceSession<'a>,
}

impl<'a> ServiceRunningProbe<'a> {
    pub fn new(session: &'a ServiceSession<'a>) -> Self {
        Self { session }
    }
}

impl Probe for ServiceRunningProbe<'_> {
    fn probe(&self) -> Result<bool> {
        self.session.with(|service| {
            let state = service.query()?;
            tracing::trace!(service = service.name(), %state, "Queried service state");
            Ok(state == ServiceState::Running)
        })
    }
}

/// Whether a process with the given image name exists (exact match)
pub struct ProcessRunningProbe<'a> {
    processes: &'a dyn ProcessTable,
    image_name: &'a str,
}

impl<'a> ProcessRunningProbe<'a> {
    pub fn new(processes: &'a dyn ProcessTable, image_name: &'a str) -> Self {
        Self {
            processes,
            image_name,
        }
    }
}

impl Probe for ProcessRunningProbe<'_> {
    fn probe(&self) -> Result<bool> {
        Ok(self.processes.find_by_name(self.image_name)?)
    }
}

/// Whether the dependency's status command reports a connected state
///
/// A non-zero exit, non-UTF-8 output or empty output is an error rather than
/// an unhealthy answer. The marker match is case-sensitive, so a status of
/// `Disconnected` does not count as connected.
pub struct ConnectivityProbe<'a> {
    runner: &'a dyn CommandRunner,
    cli: &'a CliCommands,
}

impl<'a> ConnectivityProbe<'a> {
    pub fn new(runner: &'a dyn CommandRunner, cli: &'a CliCommands) -> Self {
        Self { runner, cli }
    }
}

impl Probe for ConnectivityProbe<'_> {
    fn probe(&self) -> Result<bool> {
        let program = self.cli.program.as_str();
        let args: Vec<&str> = self.cli.status_args.iter().map(String::as_str).collect();

        let output = self.runner.run(program, &args)?.check(program)?;
        let text = output.stdout_text(program)?;
        if text.trim().is_empty() {
            return Err(Error::UnexpectedOutput {
                program: program.to_string(),
                message: "status command printed nothing".to_string(),
            });
        }

        tracing::trace!(status = text.trim(), "Queried connection status");
        Ok(text.contains(&self.cli.connected_marker))
    }
}
