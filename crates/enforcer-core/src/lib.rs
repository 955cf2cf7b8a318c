//! Reconciliation engine for the Enforcer watchdog
//!
//! The engine keeps one externally managed dependency (a VPN client and its
//! background service) healthy by running an ordered chain of [`Stage`]s.
//! Each stage pairs a read-only [`Probe`] with a [`Remedy`] and a
//! [`PollPolicy`]: probe once, remediate once if unhealthy, then poll the
//! probe with a [`StatePoller`] until it reports healthy or the budget is
//! spent.
//!
//! All host access goes through the collaborator traits in `enforcer-sys`
//! and `enforcer-fs`, passed in as [`Collaborators`].

pub mod config;
pub mod engine;
pub mod error;
pub mod poller;
pub mod probe;
pub mod remediate;
pub mod report;
pub mod session;
pub mod stage;
pub mod target;

pub use config::{EnforcerConfig, PollSettings, StageToggles, DEFAULT_CONFIG_FILE};
pub use engine::{Collaborators, ReconciliationEngine};
pub use error::{Error, Result, StageFailure};
pub use poller::{PollFailure, PollOutcome, PollPolicy, StatePoller};
pub use probe::Probe;
pub use remediate::{Remediation, Remediator};
pub use report::{Mode, Outcome, ReconciliationReport};
pub use session::ServiceSession;
pub use stage::{Remedy, Stage, StageKind, StageResult, StageStatus};
pub use target::{CliCommands, TargetDescriptor};
