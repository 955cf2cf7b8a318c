//! Administrator privilege detection and elevated relaunch
//!
//! On Windows the test asks the current token whether it is a member of the
//! built-in Administrators group (`S-1-5-32-544`). Under UAC a filtered token
//! carries that group for deny only and the test answers `False`. PowerShell
//! prints the answer as `True`/`False` whatever the display language.

use std::ffi::OsString;

use crate::command::{CommandOutput, CommandRunner, SystemRunner};
use crate::error::{Error, Result};

/// Security identifier of the built-in Administrators group
pub const ADMINISTRATORS_SID: &str = "S-1-5-32-544";

/// Privilege primitives used by the privilege stage and the binary
pub trait Elevation {
    /// Whether the current process holds administrator rights.
    ///
    /// Any failure to determine membership is reported as "not elevated".
    fn is_elevated(&self) -> bool;

    /// Request a new elevated instance of the current executable, passing
    /// `args` through. Returns once the request has been issued; it does
    /// not wait for the new instance.
    fn relaunch_elevated(&self, args: &[OsString]) -> Result<()>;
}

/// [`Elevation`] backed by PowerShell (Windows) or `id` (elsewhere)
#[derive(Debug, Default, Clone)]
pub struct SystemElevation<R = SystemRunner> {
    runner: R,
}

impl SystemElevation<SystemRunner> {
    pub fn new() -> Self {
        Self::with_runner(SystemRunner)
    }
}

impl<R: CommandRunner> SystemElevation<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    #[cfg(windows)]
    fn query_membership(&self) -> Result<bool> {
        let output = self.powershell(&membership_script())?;
        parse_membership(&output.stdout_lossy())
    }

    #[cfg(not(windows))]
    fn query_membership(&self) -> Result<bool> {
        let output = self.runner.run("id", &["-u"])?.check("id")?;
        Ok(output.stdout_lossy().trim() == "0")
    }

    #[cfg_attr(not(windows), allow(dead_code))]
    fn powershell(&self, script: &str) -> Result<CommandOutput> {
        self.runner
            .run(
                "powershell",
                &["-NoProfile", "-NonInteractive", "-Command", script],
            )?
            .check("powershell")
    }
}

impl<R: CommandRunner> Elevation for SystemElevation<R> {
    fn is_elevated(&self) -> bool {
        match self.query_membership() {
            Ok(elevated) => elevated,
            Err(e) => {
                tracing::debug!("Could not determine elevation, assuming not elevated: {}", e);
                false
            }
        }
    }

    #[cfg(windows)]
    fn relaunch_elevated(&self, args: &[OsString]) -> Result<()> {
        let exe = std::env::current_exe().map_err(Error::CurrentExe)?;
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        let script = runas_script(&exe.to_string_lossy(), &args);
        tracing::debug!(%script, "Requesting elevated relaunch");

        self.powershell(&script)?;
        Ok(())
    }

    #[cfg(not(windows))]
    fn relaunch_elevated(&self, args: &[OsString]) -> Result<()> {
        let _ = args;
        Err(Error::ElevationUnsupported)
    }
}

/// PowerShell expression printing whether the current token is an administrator
pub fn membership_script() -> String {
    format!(
        "([Security.Principal.WindowsPrincipal][Security.Principal.WindowsIdentity]::GetCurrent())\
         .IsInRole([Security.Principal.SecurityIdentifier]'{}')",
        ADMINISTRATORS_SID
    )
}

/// Parse the `True`/`False` printed by [`membership_script`]
pub fn parse_membership(output: &str) -> Result<bool> {
    match output.trim() {
        answer if answer.eq_ignore_ascii_case("true") => Ok(true),
        answer if answer.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(Error::parse(
            "administrator membership",
            format!("unexpected answer '{}'", other),
        )),
    }
}

/// PowerShell command that relaunches `exe` elevated with `args`
pub fn runas_script(exe: &str, args: &[String]) -> String {
    let mut script = format!("Start-Process -FilePath {} -Verb RunAs", ps_quote(exe));
    if !args.is_empty() {
        let list = args
            .iter()
            .map(|a| ps_quote(&windows_arg(a)))
            .collect::<Vec<_>>()
            .join(",");
        script.push_str(" -ArgumentList ");
        script.push_str(&list);
    }
    script
}

/// Single-quote a PowerShell literal
fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote one argument for the Windows command line the new process receives
///
/// Backslashes are literal except in a run that ends at a quote, where each
/// one has to be doubled so the quote keeps its meaning.
fn windows_arg(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains([' ', '\t', '"']) {
        return arg.to_string();
    }

    let mut quoted = String::from('"');
    let mut backslashes = 0;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                quoted.extend(std::iter::repeat_n('\\', backslashes * 2 + 1));
                quoted.push('"');
                backslashes = 0;
            }
            _ => {
                quoted.extend(std::iter::repeat_n('\\', backslashes));
                quoted.push(c);
                backslashes = 0;
            }
        }
    }
    quoted.extend(std::iter::repeat_n('\\', backslashes * 2));
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("True\r\n", true)]
    #[case("False\r\n", false)]
    #[case("  true ", true)]
    fn test_parse_membership(#[case] output: &str, #[case] expected: bool) {
        assert_eq!(parse_membership(output).unwrap(), expected);
    }

    #[test]
    fn test_parse_membership_rejects_other_output() {
        let result = parse_membership("Zugriff verweigert\r\n");
        assert!(matches!(result, Err(Error::Parse { .. })));
    }

    #[test]
    fn test_membership_script_names_the_sid() {
        let script = membership_script();
        assert!(script.contains("IsInRole([Security.Principal.SecurityIdentifier]'S-1-5-32-544')"));
    }

    #[test]
    fn test_runas_script_without_args() {
        assert_eq!(
            runas_script(r"C:\Program Files\Enforcer\enforcer.exe", &[]),
            r"Start-Process -FilePath 'C:\Program Files\Enforcer\enforcer.exe' -Verb RunAs"
        );
    }

    #[test]
    fn test_runas_script_quotes_arguments() {
        let args = vec![
            "--config".to_string(),
            r"C:\My Configs\it's.toml".to_string(),
        ];
        assert_eq!(
            runas_script(r"C:\enforcer.exe", &args),
            concat!(
                r"Start-Process -FilePath 'C:\enforcer.exe' -Verb RunAs ",
                r#"-ArgumentList '--config','"C:\My Configs\it''s.toml"'"#
            )
        );
    }

    #[rstest]
    #[case("--elevated", "--elevated")]
    #[case("", r#""""#)]
    #[case(r"C:\My Dir\", r#""C:\My Dir\\""#)]
    #[case(r"C:\My Dir\\", r#""C:\My Dir\\\\""#)]
    #[case(r#"say "hi""#, r#""say \"hi\"""#)]
    #[case(r#"a\"b c"#, r#""a\\\"b c""#)]
    #[case(r"C:\plain\path", r"C:\plain\path")]
    fn test_windows_arg(#[case] arg: &str, #[case] expected: &str) {
        assert_eq!(windows_arg(arg), expected);
    }

    struct FailingRunner;

    impl CommandRunner for FailingRunner {
        fn run(&self, program: &str, _args: &[&str]) -> Result<CommandOutput> {
            Err(Error::Spawn {
                program: program.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    #[test]
    fn test_membership_failure_is_not_elevated() {
        let elevation = SystemElevation::with_runner(FailingRunner);
        assert!(!elevation.is_elevated());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_relaunch_unsupported_off_windows() {
        let elevation = SystemElevation::with_runner(FailingRunner);
        assert!(matches!(
            elevation.relaunch_elevated(&[]),
            Err(Error::ElevationUnsupported)
        ));
    }
}
