//! Operating-system collaborators for the Enforcer watchdog
//!
//! Every interaction with the host goes through one of the narrow traits
//! defined here, so the reconciliation engine can be driven by fakes in
//! tests and by the real system in production:
//!
//! - [`CommandRunner`]: run an external program and capture its output
//! - [`Elevation`]: administrator membership test and elevated relaunch
//! - [`ProcessTable`]: find a process by image name, launch a detached one
//! - [`ServiceManager`]: connect to the service manager and control one service
//!
//! The production implementations shell out to the platform's own tools
//! (`sc.exe`, `reg`, `tasklist`, `powershell`) rather than binding the
//! native APIs directly.

pub mod command;
pub mod elevation;
pub mod error;
pub mod process;
pub mod service;

pub use command::{CommandOutput, CommandRunner, SystemRunner};
pub use elevation::{Elevation, SystemElevation};
pub use error::{Error, Result};
pub use process::{ProcessTable, SystemProcessTable};
pub use service::{
    ErrorControl, ManagerConnection, ScServiceManager, ServiceConfig, ServiceHandle,
    ServiceManager, ServiceState, ServiceType, StartType,
};
