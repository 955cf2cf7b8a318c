//! Service manager backed by `sc.exe`
//!
//! `sc.exe` exits with the Win32 error code of the failed call, which is how
//! a missing service (1060) and an already running service (1056) are told
//! apart from real failures.
//!
//! Its output is printed in the console code page, so text fields read back
//! from it are lossy. Updates therefore send only the keys whose value
//! differs from the configuration last read; the service manager keeps every
//! field that is not named.

use std::cell::RefCell;
use std::collections::HashMap;

use super::types::{ErrorControl, ServiceConfig, ServiceState, ServiceType, StartType};
use super::{ManagerConnection, ServiceHandle, ServiceManager};
use crate::command::{CommandOutput, CommandRunner, SystemRunner};
use crate::error::{Error, Result};

const SC: &str = "sc.exe";
const REG: &str = "reg";
const ERROR_SERVICE_ALREADY_RUNNING: i32 = 1056;
const ERROR_SERVICE_DOES_NOT_EXIST: i32 = 1060;
/// Buffer size passed to `sc qc`/`sc qdescription` so long values are not truncated
const QUERY_BUFFER: &str = "8192";
const SERVICES_KEY: &str = r"HKLM\SYSTEM\CurrentControlSet\Services";
const DELAYED_VALUE: &str = "DelayedAutostart";

/// [`ServiceManager`] that drives `sc.exe`
#[derive(Debug, Default, Clone)]
pub struct ScServiceManager<R = SystemRunner> {
    runner: R,
}

impl ScServiceManager<SystemRunner> {
    pub fn new() -> Self {
        Self::with_runner(SystemRunner)
    }
}

impl<R> ScServiceManager<R>
where
    R: CommandRunner + Clone + 'static,
{
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }
}

impl<R> ServiceManager for ScServiceManager<R>
where
    R: CommandRunner + Clone + 'static,
{
    fn connect(&self) -> Result<Box<dyn ManagerConnection>> {
        tracing::debug!("Connected to service manager");
        Ok(Box::new(ScConnection {
            runner: self.runner.clone(),
        }))
    }
}

/// Connection half of the `sc.exe` backend
#[derive(Debug)]
pub struct ScConnection<R> {
    runner: R,
}

impl<R> ManagerConnection for ScConnection<R>
where
    R: CommandRunner + Clone + 'static,
{
    fn open_service(&self, name: &str) -> Result<Box<dyn ServiceHandle>> {
        let output = self.runner.run(SC, &["query", name])?;
        match output.code {
            Some(0) => {
                tracing::debug!(service = name, "Opened service");
                Ok(Box::new(ScService {
                    runner: self.runner.clone(),
                    name: name.to_string(),
                    last_read: RefCell::new(None),
                }))
            }
            Some(ERROR_SERVICE_DOES_NOT_EXIST) => Err(Error::ServiceNotFound {
                name: name.to_string(),
            }),
            _ => Err(control_error(name, "open", &output)),
        }
    }
}

impl<R> Drop for ScConnection<R> {
    fn drop(&mut self) {
        tracing::debug!("Disconnected from service manager");
    }
}

/// One service opened through `sc.exe`
#[derive(Debug)]
pub struct ScService<R> {
    runner: R,
    name: String,
    /// Configuration as of the last successful read or write
    last_read: RefCell<Option<ServiceConfig>>,
}

impl<R: CommandRunner> ScService<R> {
    fn sc(&self, operation: &str, args: &[&str]) -> Result<CommandOutput> {
        let output = self.runner.run(SC, args)?;
        if output.success() {
            Ok(output)
        } else {
            Err(control_error(&self.name, operation, &output))
        }
    }

    /// `DelayedAutostart` from the service's registry key.
    ///
    /// `sc qc` only prints `(DELAYED)` for automatic services, so the flag of
    /// a manual or disabled service has to be read from the registry. A
    /// missing value means not delayed.
    fn delayed_flag(&self) -> Result<bool> {
        let key = format!(r"{}\{}", SERVICES_KEY, self.name);
        let output = self.runner.run(REG, &["query", &key, "/v", DELAYED_VALUE])?;
        if !output.success() {
            tracing::debug!(service = %self.name, "No delayed-start value, assuming not delayed");
            return Ok(false);
        }
        parse_reg_dword(&output.stdout_lossy(), DELAYED_VALUE).map(|value| value != 0)
    }
}

impl<R: CommandRunner> ServiceHandle for ScService<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> Result<ServiceConfig> {
        let qc = self.sc("query config", &["qc", &self.name, QUERY_BUFFER])?;
        let mut config = parse_qc(&qc.stdout_lossy())?;

        let qdesc = self.sc(
            "query description",
            &["qdescription", &self.name, QUERY_BUFFER],
        )?;
        config.description = parse_description(&qdesc.stdout_lossy());
        config.delayed_auto_start |= self.delayed_flag()?;

        *self.last_read.borrow_mut() = Some(config.clone());
        Ok(config)
    }

    fn update_config(&self, config: &ServiceConfig) -> Result<()> {
        let cached = self.last_read.borrow().clone();
        let current = match cached {
            Some(current) => current,
            None => self.config()?,
        };

        let args = config_args(&self.name, &current, config);
        if args.len() > 2 {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            self.sc("update config", &args)?;
        }
        if config.description != current.description {
            self.sc(
                "update description",
                &["description", &self.name, &config.description],
            )?;
        }

        *self.last_read.borrow_mut() = Some(config.clone());
        Ok(())
    }

    fn query(&self) -> Result<ServiceState> {
        let output = self.sc("query", &["query", &self.name])?;
        parse_state(&output.stdout_lossy())
    }

    fn start(&self) -> Result<()> {
        let output = self.runner.run(SC, &["start", &self.name])?;
        match output.code {
            Some(0) => Ok(()),
            Some(ERROR_SERVICE_ALREADY_RUNNING) => {
                tracing::debug!(service = %self.name, "Service was already running");
                Ok(())
            }
            _ => Err(control_error(&self.name, "start", &output)),
        }
    }
}

impl<R> Drop for ScService<R> {
    fn drop(&mut self) {
        tracing::debug!(service = %self.name, "Closed service handle");
    }
}

fn control_error(name: &str, operation: &str, output: &CommandOutput) -> Error {
    Error::ServiceControl {
        name: name.to_string(),
        operation: operation.to_string(),
        code: output.code.unwrap_or(-1),
        message: output.diagnostic(),
    }
}

/// Split `KEY : value` lines, folding `: value` continuation lines into the
/// previous key (used by `DEPENDENCIES`).
fn fields(output: &str) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    let mut last_key: Option<String> = None;

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim().to_string();

        if key.is_empty() {
            if let Some(last) = &last_key {
                map.entry(last.clone()).or_default().push(value);
            }
            continue;
        }

        map.entry(key.to_string()).or_default().push(value);
        last_key = Some(key.to_string());
    }

    map
}

fn first<'a>(fields: &'a HashMap<String, Vec<String>>, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(|v| v.first()).map(String::as_str)
}

fn leading_code(value: &str, radix: u32, what: &str) -> Result<u32> {
    let token = value.split_whitespace().next().unwrap_or("");
    u32::from_str_radix(token, radix)
        .map_err(|_| Error::parse(what, format!("unexpected value '{}'", value)))
}

fn required<'a>(fields: &'a HashMap<String, Vec<String>>, key: &str) -> Result<&'a str> {
    first(fields, key).ok_or_else(|| Error::parse("sc qc output", format!("missing {}", key)))
}

/// Parse `sc qc` output into a [`ServiceConfig`] (description left empty)
pub fn parse_qc(output: &str) -> Result<ServiceConfig> {
    let fields = fields(output);

    // TYPE is printed in hex without a prefix ("10  WIN32_OWN_PROCESS").
    let service_type = ServiceType(leading_code(required(&fields, "TYPE")?, 16, "TYPE")?);

    let start_raw = required(&fields, "START_TYPE")?;
    let start_code = leading_code(start_raw, 10, "START_TYPE")?;
    let start_type = StartType::from_code(start_code)
        .ok_or_else(|| Error::parse("START_TYPE", format!("unknown code {}", start_code)))?;
    let delayed_auto_start = start_raw.contains("(DELAYED)");

    let error_code = leading_code(required(&fields, "ERROR_CONTROL")?, 10, "ERROR_CONTROL")?;
    let error_control = ErrorControl::from_code(error_code)
        .ok_or_else(|| Error::parse("ERROR_CONTROL", format!("unknown code {}", error_code)))?;

    let dependencies = fields
        .get("DEPENDENCIES")
        .map(|deps| deps.iter().filter(|d| !d.is_empty()).cloned().collect())
        .unwrap_or_default();

    Ok(ServiceConfig {
        service_type,
        start_type,
        error_control,
        binary_path: required(&fields, "BINARY_PATH_NAME")?.to_string(),
        load_order_group: first(&fields, "LOAD_ORDER_GROUP").unwrap_or("").to_string(),
        dependencies,
        account: first(&fields, "SERVICE_START_NAME").unwrap_or("").to_string(),
        display_name: first(&fields, "DISPLAY_NAME").unwrap_or("").to_string(),
        description: String::new(),
        delayed_auto_start,
    })
}

/// Parse `sc qdescription` output
///
/// The description runs from the `DESCRIPTION:` label to the end of the
/// output and may span several lines.
pub fn parse_description(output: &str) -> String {
    let mut lines = output.lines();
    let Some(first) = lines.find_map(|line| line.trim_start().strip_prefix("DESCRIPTION:")) else {
        return String::new();
    };

    let mut description = first.trim_start().to_string();
    for line in lines {
        description.push('\n');
        description.push_str(line);
    }
    description.trim_end().to_string()
}

/// Read a `REG_DWORD` value from `reg query ... /v <name>` output
pub fn parse_reg_dword(output: &str, name: &str) -> Result<u32> {
    let raw = output
        .lines()
        .map(str::split_whitespace)
        .find_map(|mut tokens| match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(value), Some("REG_DWORD"), Some(data)) if value.eq_ignore_ascii_case(name) => {
                Some(data)
            }
            _ => None,
        })
        .ok_or_else(|| Error::parse("reg query output", format!("missing {}", name)))?;

    let hex = raw.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(hex, 16)
        .map_err(|_| Error::parse(name, format!("unexpected value '{}'", raw)))
}

/// Parse the `STATE` line of `sc query` output
pub fn parse_state(output: &str) -> Result<ServiceState> {
    let fields = fields(output);
    let raw = first(&fields, "STATE")
        .ok_or_else(|| Error::parse("sc query output", "missing STATE"))?;
    let code = leading_code(raw, 10, "STATE")?;
    ServiceState::from_code(code)
        .ok_or_else(|| Error::parse("STATE", format!("unknown code {}", code)))
}

/// Arguments for `sc config` that move `current` to `desired`
///
/// Only keys whose value differs are named. The result is just
/// `["config", name]` when nothing but the description changed.
pub fn config_args(name: &str, current: &ServiceConfig, desired: &ServiceConfig) -> Vec<String> {
    let mut args = vec!["config".to_string(), name.to_string()];
    let mut push = |key: &str, value: &str| {
        args.push(format!("{}=", key));
        args.push(value.to_string());
    };

    if desired.service_type != current.service_type {
        let base_type = ServiceType(desired.service_type.0 & !ServiceType::INTERACTIVE_PROCESS);
        let type_keyword = match base_type {
            ServiceType::OWN_PROCESS => Some("own"),
            ServiceType::SHARE_PROCESS => Some("share"),
            ServiceType::KERNEL_DRIVER => Some("kernel"),
            ServiceType::FILE_SYSTEM_DRIVER => Some("filesys"),
            _ => None,
        };
        if let Some(keyword) = type_keyword {
            push("type", keyword);
            if desired.service_type.is_interactive() {
                push("type", "interact");
            }
        }
    }

    if desired.start_type != current.start_type
        || desired.delayed_auto_start != current.delayed_auto_start
    {
        let start = match desired.start_type {
            StartType::Boot => "boot",
            StartType::System => "system",
            StartType::Automatic if desired.delayed_auto_start => "delayed-auto",
            StartType::Automatic => "auto",
            StartType::Manual => "demand",
            StartType::Disabled => "disabled",
        };
        push("start", start);
    }

    if desired.error_control != current.error_control {
        let error = match desired.error_control {
            ErrorControl::Ignore => "ignore",
            ErrorControl::Normal => "normal",
            ErrorControl::Severe => "severe",
            ErrorControl::Critical => "critical",
        };
        push("error", error);
    }

    if desired.binary_path != current.binary_path {
        push("binPath", &desired.binary_path);
    }
    if desired.load_order_group != current.load_order_group {
        push("group", &desired.load_order_group);
    }
    if desired.dependencies != current.dependencies {
        let depend = if desired.dependencies.is_empty() {
            "/".to_string()
        } else {
            desired.dependencies.join("/")
        };
        push("depend", &depend);
    }
    if desired.account != current.account && !desired.account.is_empty() {
        push("obj", &desired.account);
    }
    if desired.display_name != current.display_name {
        push("DisplayName", &desired.display_name);
    }

    args
}
