//! Subprocess execution for external command-line tools
//!
//! Wraps `std::process::Command` behind [`CommandRunner`] so callers that
//! parse tool output (`sc.exe`, `tasklist`, the dependency's own CLI) can be
//! exercised against canned output.

use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Captured result of one external command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Build a successful output with the given stdout text
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into().into_bytes(),
            stderr: Vec::new(),
        }
    }

    /// Build an output with an explicit exit code and stdout text
    pub fn with_code(code: i32, stdout: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: stdout.into().into_bytes(),
            stderr: Vec::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout decoded strictly; invalid UTF-8 is an error.
    pub fn stdout_text(&self, program: &str) -> Result<&str> {
        std::str::from_utf8(&self.stdout).map_err(|_| Error::InvalidOutput {
            program: program.to_string(),
        })
    }

    /// Stdout decoded lossily, for tools whose console code page is not UTF-8
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// The most useful diagnostic text: stderr if present, else stdout
    pub fn diagnostic(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr);
        let text = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&self.stdout)
        } else {
            stderr
        };
        text.trim().to_string()
    }

    /// Convert a non-zero exit into [`Error::CommandFailed`]
    pub fn check(self, program: &str) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::CommandFailed {
                program: program.to_string(),
                code: self.code.unwrap_or(-1),
                message: self.diagnostic(),
            })
        }
    }
}

/// Runs an external program to completion and captures its output
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        (**self).run(program, args)
    }
}

/// [`CommandRunner`] that executes real processes
///
/// Standard input is closed so an interactive tool cannot block the
/// watchdog waiting for input.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        tracing::debug!(program, ?args, "Running external command");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| Error::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_passes_successful_output() {
        let output = CommandOutput::ok("fine").check("tool").unwrap();
        assert_eq!(output.stdout_text("tool").unwrap(), "fine");
    }

    #[test]
    fn test_check_reports_exit_code_and_stderr() {
        let output = CommandOutput {
            code: Some(3),
            stdout: b"ignored".to_vec(),
            stderr: b"  boom \n".to_vec(),
        };

        match output.check("tool") {
            Err(Error::CommandFailed { code, message, .. }) => {
                assert_eq!(code, 3);
                assert_eq!(message, "boom");
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_diagnostic_falls_back_to_stdout() {
        let output = CommandOutput::with_code(1060, "[SC] OpenService FAILED 1060\n");
        assert_eq!(output.diagnostic(), "[SC] OpenService FAILED 1060");
    }

    #[test]
    fn test_stdout_text_rejects_invalid_utf8() {
        let output = CommandOutput {
            code: Some(0),
            stdout: vec![0xff, 0xfe, 0x00],
            stderr: Vec::new(),
        };
        assert!(matches!(
            output.stdout_text("warp-cli"),
            Err(Error::InvalidOutput { .. })
        ));
    }

    #[test]
    fn test_signal_termination_counts_as_failure() {
        let output = CommandOutput {
            code: None,
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        assert!(!output.success());
        assert!(matches!(
            output.check("tool"),
            Err(Error::CommandFailed { code: -1, .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_stdout() {
        let output = SystemRunner.run("echo", &["hello"]).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout_text("echo").unwrap().trim(), "hello");
    }

    #[test]
    fn test_system_runner_missing_program_is_spawn_error() {
        let result = SystemRunner.run("enforcer-definitely-not-a-program", &[]);
        assert!(matches!(result, Err(Error::Spawn { .. })));
    }
}
