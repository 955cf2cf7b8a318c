//! Corrective actions, one per health dimension
//!
//! Each remediator performs exactly one side effect and returns without
//! waiting for it to take hold; confirming the effect is the poller's job.

use std::path::PathBuf;

use enforcer_sys::{CommandRunner, ProcessTable, ServiceConfig, StartType};

use crate::error::Result;
use crate::session::ServiceSession;
use crate::target::CliCommands;

/// What a remediator reported after issuing its action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remediation {
    /// The action was carried out
    Applied,
    /// The action was issued but its result is unknown until the next probe
    Pending,
}

/// A side-effecting action that moves one health dimension toward healthy
pub trait Remediator {
    fn remediate(&self) -> Result<Remediation>;
}

impl<F> Remediator for F
where
    F: Fn() -> Result<Remediation>,
{
    fn remediate(&self) -> Result<Remediation> {
        self()
    }
}

/// Launch the dependency's GUI executable, detached
pub struct StartProcess<'a> {
    processes: &'a dyn ProcessTable,
    path: PathBuf,
}

impl<'a> StartProcess<'a> {
    pub fn new(processes: &'a dyn ProcessTable, path: PathBuf) -> Self {
        Self { processes, path }
    }
}

impl Remediator for StartProcess<'_> {
    fn remediate(&self) -> Result<Remediation> {
        let pid = self.processes.launch(&self.path, &[])?;
        tracing::debug!(pid, path = %self.path.display(), "Launched process");
        Ok(Remediation::Applied)
    }
}

/// The configuration `current` becomes once switched to automatic start
///
/// Only the start type changes; every other field is carried over as is.
pub fn auto_start_config(current: &ServiceConfig) -> ServiceConfig {
    current.with_start_type(StartType::Automatic)
}

/// Rewrite the service's start type to automatic
pub struct ConfigureAutoStart<'a> {
    session: &'a ServiceSession<'a>,
}

impl<'a> ConfigureAutoStart<'a> {
    pub fn new(session: &'a ServiceSession<'a>) -> Self {
        Self { session }
    }
}

impl Remediator for ConfigureAutoStart<'_> {
    fn remediate(&self) -> Result<Remediation> {
        self.session.with(|service| {
            let current = service.config()?;
            if current.start_type == StartType::Automatic {
                tracing::debug!(service = service.name(), "Start type already automatic");
                return Ok(Remediation::Applied);
            }

            service.update_config(&auto_start_config(&current))?;
            tracing::info!(
                service = service.name(),
                from = %current.start_type,
                "Set service start type to automatic"
            );
            Ok(Remediation::Applied)
        })
    }
}

/// Issue a start command to the service
pub struct StartService<'a> {
    session: &'a ServiceSession<'a>,
}

impl<'a> StartService<'a> {
    pub fn new(session: &'a ServiceSession<'a>) -> Self {
        Self { session }
    }
}

impl Remediator for StartService<'_> {
    fn remediate(&self) -> Result<Remediation> {
        self.session.with(|service| {
            service.start()?;
            tracing::debug!(service = service.name(), "Start requested");
            Ok(Remediation::Applied)
        })
    }
}

/// Ask the dependency's CLI to connect
///
/// Output carrying the success marker is [`Remediation::Applied`]. Any other
/// output from a successful run is [`Remediation::Pending`]: the request went
/// out and the connectivity poll decides whether it worked.
pub struct ConnectDependency<'a> {
    runner: &'a dyn CommandRunner,
    cli: &'a CliCommands,
}

impl<'a> ConnectDependency<'a> {
    pub fn new(runner: &'a dyn CommandRunner, cli: &'a CliCommands) -> Self {
        Self { runner, cli }
    }
}

impl Remediator for ConnectDependency<'_> {
    fn remediate(&self) -> Result<Remediation> {
        let program = self.cli.program.as_str();
        let args: Vec<&str> = self.cli.connect_args.iter().map(String::as_str).collect();

        let output = self.runner.run(program, &args)?.check(program)?;
        let text = output.stdout_lossy();
        if text.contains(&self.cli.success_marker) {
            tracing::debug!("Connect request succeeded");
            Ok(Remediation::Applied)
        } else {
            tracing::warn!(output = text.trim(), "Connect request did not confirm success");
            Ok(Remediation::Pending)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use enforcer_sys::{CommandOutput, ErrorControl, ServiceType};
    use enforcer_test_utils::{FakeCommandRunner, FakeProcessTable, FakeServiceManager};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn manual_config() -> ServiceConfig {
        ServiceConfig {
            service_type: ServiceType::OWN_PROCESS,
            start_type: StartType::Manual,
            error_control: ErrorControl::Normal,
            binary_path: r#""C:\Program Files\Cloudflare\Cloudflare WARP\warp-svc.exe""#.into(),
            load_order_group: String::new(),
            dependencies: vec!["nsi".into(), "Tcpip".into()],
            account: "LocalSystem".into(),
            display_name: "Cloudflare WARP".into(),
            description: "Cloudflare Zero Trust Client".into(),
            delayed_auto_start: true,
        }
    }

    #[test]
    fn test_start_process_launches_without_args() {
        let processes = FakeProcessTable::new();
        let path = PathBuf::from(r"C:\WARP\Cloudflare WARP.exe");

        let result = StartProcess::new(&processes, path.clone()).remediate().unwrap();

        assert_eq!(result, Remediation::Applied);
        assert_eq!(processes.launches(), vec![path]);
    }

    #[test]
    fn test_start_process_failure() {
        let processes = FakeProcessTable::new().failing();
        let result = StartProcess::new(&processes, PathBuf::from("gui.exe")).remediate();
        assert!(matches!(result, Err(Error::Sys(_))));
    }

    #[test]
    fn test_configure_auto_start_rewrites_only_start_type() {
        let manager = FakeServiceManager::new("svc").with_config(manual_config());
        let session = ServiceSession::new(&manager, "svc");

        ConfigureAutoStart::new(&session).remediate().unwrap();

        let expected = ServiceConfig {
            start_type: StartType::Automatic,
            ..manual_config()
        };
        assert_eq!(manager.config_updates(), vec![expected]);
    }

    #[test]
    fn test_configure_auto_start_skips_when_already_automatic() {
        let manager = FakeServiceManager::new("svc");
        let session = ServiceSession::new(&manager, "svc");

        let result = ConfigureAutoStart::new(&session).remediate().unwrap();

        assert_eq!(result, Remediation::Applied);
        assert!(manager.config_updates().is_empty());
    }

    #[test]
    fn test_configure_auto_start_rejected_update() {
        let manager = FakeServiceManager::new("svc")
            .with_config(manual_config())
            .refuse_updates();
        let session = ServiceSession::new(&manager, "svc");

        let result = ConfigureAutoStart::new(&session).remediate();

        assert!(matches!(
            result,
            Err(Error::Sys(enforcer_sys::Error::ServiceControl { .. }))
        ));
    }

    #[test]
    fn test_start_service_issues_start() {
        let manager =
            FakeServiceManager::new("svc").with_state(enforcer_sys::ServiceState::Stopped);
        let session = ServiceSession::new(&manager, "svc");

        StartService::new(&session).remediate().unwrap();

        assert_eq!(manager.starts(), 1);
    }

    #[test]
    fn test_connect_success_marker() {
        let cli = CliCommands::default();
        let runner =
            FakeCommandRunner::new().respond("warp-cli connect", CommandOutput::ok("Success\n"));

        let result = ConnectDependency::new(&runner, &cli).remediate().unwrap();

        assert_eq!(result, Remediation::Applied);
        assert_eq!(runner.calls(), vec!["warp-cli connect"]);
    }

    #[test]
    fn test_connect_without_marker_is_pending() {
        let cli = CliCommands::default();
        let runner = FakeCommandRunner::new()
            .respond("warp-cli connect", CommandOutput::ok("Error: registration missing\n"));

        let result = ConnectDependency::new(&runner, &cli).remediate().unwrap();

        assert_eq!(result, Remediation::Pending);
    }

    #[test]
    fn test_connect_non_zero_exit_is_error() {
        let cli = CliCommands::default();
        let runner = FakeCommandRunner::new()
            .respond("warp-cli connect", CommandOutput::with_code(2, ""));

        assert!(ConnectDependency::new(&runner, &cli).remediate().is_err());
    }

    fn start_type() -> impl Strategy<Value = StartType> {
        prop_oneof![
            Just(StartType::Boot),
            Just(StartType::System),
            Just(StartType::Automatic),
            Just(StartType::Manual),
            Just(StartType::Disabled),
        ]
    }

    fn error_control() -> impl Strategy<Value = ErrorControl> {
        prop_oneof![
            Just(ErrorControl::Ignore),
            Just(ErrorControl::Normal),
            Just(ErrorControl::Severe),
            Just(ErrorControl::Critical),
        ]
    }

    prop_compose! {
        fn service_config()(
            service_type in any::<u32>(),
            start_type in start_type(),
            error_control in error_control(),
            binary_path in ".*",
            load_order_group in ".*",
            dependencies in prop::collection::vec("[A-Za-z0-9]{1,12}", 0..4),
            account in ".*",
            display_name in ".*",
            description in ".*",
            delayed_auto_start in any::<bool>(),
        ) -> ServiceConfig {
            ServiceConfig {
                service_type: ServiceType(service_type),
                start_type,
                error_control,
                binary_path,
                load_order_group,
                dependencies,
                account,
                display_name,
                description,
                delayed_auto_start,
            }
        }
    }

    proptest! {
        #[test]
        fn prop_auto_start_config_preserves_other_fields(current in service_config()) {
            let updated = auto_start_config(&current);

            prop_assert_eq!(updated.start_type, StartType::Automatic);
            prop_assert_eq!(
                updated,
                ServiceConfig { start_type: StartType::Automatic, ..current }
            );
        }
    }
}
