//! Process enumeration and detached launch

use std::path::Path;
use std::process::{Command, Stdio};

use crate::command::{CommandRunner, SystemRunner};
use crate::error::{Error, Result};

/// Process lister/starter used by the process-running stage
pub trait ProcessTable {
    /// Whether a process whose image name equals `name` exactly is running
    fn find_by_name(&self, name: &str) -> Result<bool>;

    /// Launch `path` detached, with no inherited standard streams.
    ///
    /// Returns the new process id; the caller does not wait for it.
    fn launch(&self, path: &Path, args: &[&str]) -> Result<u32>;
}

/// [`ProcessTable`] backed by `tasklist` (Windows) or `ps` (elsewhere)
#[derive(Debug, Default, Clone)]
pub struct SystemProcessTable<R = SystemRunner> {
    runner: R,
}

impl SystemProcessTable<SystemRunner> {
    pub fn new() -> Self {
        Self::with_runner(SystemRunner)
    }
}

impl<R: CommandRunner> SystemProcessTable<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    /// Image names of every running process
    pub fn image_names(&self) -> Result<Vec<String>> {
        #[cfg(windows)]
        {
            let output = self
                .runner
                .run("tasklist", &["/FO", "CSV", "/NH"])?
                .check("tasklist")?;
            Ok(parse_tasklist_csv(&output.stdout_lossy()))
        }
        #[cfg(not(windows))]
        {
            let output = self
                .runner
                .run("ps", &["-A", "-o", "args="])?
                .check("ps")?;
            Ok(parse_ps_output(&output.stdout_lossy()))
        }
    }
}

impl<R: CommandRunner> ProcessTable for SystemProcessTable<R> {
    fn find_by_name(&self, name: &str) -> Result<bool> {
        Ok(self.image_names()?.iter().any(|image| image == name))
    }

    fn launch(&self, path: &Path, args: &[&str]) -> Result<u32> {
        let child = Command::new(path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| Error::Launch {
                path: path.display().to_string(),
                source,
            })?;
        let pid = child.id();

        // Dropping the Child handle neither waits for nor kills the process;
        // with null stdio it keeps running independently.
        drop(child);

        tracing::info!("Started process '{}' with PID {}", path.display(), pid);
        Ok(pid)
    }
}

/// Extract image names from `tasklist /FO CSV /NH` output
///
/// Each line looks like `"Cloudflare WARP.exe","4242","Console","1","52,112 K"`;
/// the image name is the first quoted field.
pub fn parse_tasklist_csv(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix('"')?;
            let end = rest.find('"')?;
            Some(rest[..end].to_string())
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Extract image names from `ps -A -o args=` output
///
/// `comm` is cut to 15 characters on Linux, so the name is taken from the
/// first word of the full command line instead. Only the file name is kept.
/// An executable path containing spaces yields its first word only.
pub fn parse_ps_output(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(|program| {
            Path::new(program)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| program.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use pretty_assertions::assert_eq;

    const TASKLIST: &str = "\"System Idle Process\",\"0\",\"Services\",\"0\",\"8 K\"\r\n\
\"warp-svc.exe\",\"3120\",\"Services\",\"0\",\"40,220 K\"\r\n\
\"Cloudflare WARP.exe\",\"9876\",\"Console\",\"1\",\"52,112 K\"\r\n";

    #[test]
    fn test_parse_tasklist_csv() {
        assert_eq!(
            parse_tasklist_csv(TASKLIST),
            vec!["System Idle Process", "warp-svc.exe", "Cloudflare WARP.exe"]
        );
    }

    #[test]
    fn test_parse_tasklist_ignores_info_line() {
        let output = "INFO: No tasks are running which match the specified criteria.\r\n";
        assert!(parse_tasklist_csv(output).is_empty());
    }

    #[test]
    fn test_parse_ps_output_keeps_file_names() {
        let output = "  /sbin/init splash\n/usr/lib/firefox/firefox -new-window\nbash\n\n";
        assert_eq!(parse_ps_output(output), vec!["init", "firefox", "bash"]);
    }

    #[test]
    fn test_parse_ps_output_keeps_long_names() {
        let output = "/opt/cloudflare-warp/warp-taskbar-helper --minimized\n";
        assert_eq!(parse_ps_output(output), vec!["warp-taskbar-helper"]);
    }

    struct CannedRunner(CommandOutput);

    impl CommandRunner for CannedRunner {
        fn run(&self, _program: &str, _args: &[&str]) -> Result<CommandOutput> {
            Ok(self.0.clone())
        }
    }

    #[cfg(windows)]
    #[test]
    fn test_find_by_name_is_exact() {
        let table = SystemProcessTable::with_runner(CannedRunner(CommandOutput::ok(TASKLIST)));
        assert!(table.find_by_name("Cloudflare WARP.exe").unwrap());
        assert!(!table.find_by_name("Cloudflare WARP").unwrap());
        assert!(!table.find_by_name("cloudflare warp.exe").unwrap());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_find_by_name_is_exact() {
        let output = CommandOutput::ok("bash\n/usr/bin/warp-taskbar-helper --tray\n");
        let table = SystemProcessTable::with_runner(CannedRunner(output));
        assert!(table.find_by_name("warp-taskbar-helper").unwrap());
        assert!(!table.find_by_name("warp").unwrap());
        assert!(!table.find_by_name("Warp-Taskbar").unwrap());
    }

    #[test]
    fn test_enumeration_failure_is_an_error() {
        let table = SystemProcessTable::with_runner(CannedRunner(CommandOutput::with_code(1, "")));
        assert!(matches!(
            table.find_by_name("anything"),
            Err(Error::CommandFailed { .. })
        ));
    }

    #[test]
    fn test_launch_missing_executable_fails() {
        let result = SystemProcessTable::new().launch(Path::new("/definitely/not/here.exe"), &[]);
        assert!(matches!(result, Err(Error::Launch { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_returns_pid() {
        let pid = SystemProcessTable::new()
            .launch(Path::new("/bin/sh"), &["-c", "exit 0"])
            .unwrap();
        assert!(pid > 0);
    }
}
