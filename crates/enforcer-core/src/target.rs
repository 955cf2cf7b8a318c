//! Static description of the managed dependency

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Invocation details for the dependency's own command-line client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliCommands {
    /// Program name or path, resolved through `PATH` when bare
    pub program: String,
    pub status_args: Vec<String>,
    pub connect_args: Vec<String>,
    /// Substring of the status output that means "connected" (case-sensitive)
    pub connected_marker: String,
    /// Substring of the connect output that means the request succeeded
    pub success_marker: String,
}

impl Default for CliCommands {
    fn default() -> Self {
        Self {
            program: "warp-cli".to_string(),
            status_args: vec!["status".to_string()],
            connect_args: vec!["connect".to_string()],
            connected_marker: "Connected".to_string(),
            success_marker: "Success".to_string(),
        }
    }
}

/// The dependency the watchdog keeps healthy
///
/// Immutable after load; the engine owns it and lends it to every stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetDescriptor {
    pub install_dir: PathBuf,
    /// File name of the user-facing executable inside `install_dir`
    pub gui_executable: String,
    /// File name of the background service executable inside `install_dir`
    pub service_executable: String,
    /// Name the service manager knows the service by
    pub service_name: String,
    /// Operator hint printed when the dependency is not installed
    pub install_hint: Option<String>,
    pub cli: CliCommands,
}

impl Default for TargetDescriptor {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from(r"C:\Program Files\Cloudflare\Cloudflare WARP"),
            gui_executable: "Cloudflare WARP.exe".to_string(),
            service_executable: "warp-svc.exe".to_string(),
            service_name: "CloudflareWARP".to_string(),
            install_hint: Some("install it with 'winget install Cloudflare.Warp'".to_string()),
            cli: CliCommands::default(),
        }
    }
}

impl TargetDescriptor {
    pub fn gui_path(&self) -> PathBuf {
        self.install_dir.join(&self.gui_executable)
    }

    pub fn service_path(&self) -> PathBuf {
        self.install_dir.join(&self.service_executable)
    }
}
