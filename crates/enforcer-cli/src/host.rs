//! Production collaborators backed by the local machine

use enforcer_core::Collaborators;
use enforcer_fs::LocalFs;
use enforcer_sys::{ScServiceManager, SystemElevation, SystemProcessTable, SystemRunner};

/// Owns one of each system collaborator for the lifetime of a command
#[derive(Default)]
pub struct SystemHost {
    elevation: SystemElevation,
    fs: LocalFs,
    processes: SystemProcessTable,
    services: ScServiceManager,
    commands: SystemRunner,
}

impl SystemHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            elevation: &self.elevation,
            fs: &self.fs,
            processes: &self.processes,
            services: &self.services,
            commands: &self.commands,
        }
    }
}
