//! Watchdog configuration
//!
//! Loaded once at startup. Every field has a default matching the stock
//! Cloudflare WARP install, so an empty or partial file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use enforcer_fs::ConfigStore;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::poller::PollPolicy;
use crate::target::TargetDescriptor;

/// File name looked up beside the executable when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "enforcer.toml";

/// Poll policy as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        let policy = PollPolicy::default();
        Self {
            interval_ms: policy.interval.as_millis() as u64,
            max_attempts: policy.max_attempts,
        }
    }
}

impl From<PollSettings> for PollPolicy {
    fn from(settings: PollSettings) -> Self {
        PollPolicy::new(Duration::from_millis(settings.interval_ms), settings.max_attempts)
    }
}

/// Which optional stage groups run
///
/// Privilege and installation stages always run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageToggles {
    /// Service auto-start and service running stages
    pub service: bool,
    pub process: bool,
    pub connectivity: bool,
}

impl Default for StageToggles {
    fn default() -> Self {
        Self {
            service: true,
            process: true,
            connectivity: true,
        }
    }
}

/// Complete watchdog configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcerConfig {
    pub target: TargetDescriptor,
    pub poll: PollSettings,
    pub stages: StageToggles,
}

impl EnforcerConfig {
    /// Load and validate a config file (`.toml` or `.json`)
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = ConfigStore::new().load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config source and load it
    ///
    /// An explicit path must exist. Otherwise `enforcer.toml` in `search_dir`
    /// is used when present, else the built-in defaults. Returns the config
    /// and the file it came from, if any.
    pub fn resolve(
        explicit: Option<&Path>,
        search_dir: Option<&Path>,
    ) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        if let Some(candidate) = search_dir.map(|dir| dir.join(DEFAULT_CONFIG_FILE)) {
            if candidate.is_file() {
                return Ok((Self::load(&candidate)?, Some(candidate)));
            }
            tracing::debug!(path = %candidate.display(), "No config file found, using defaults");
        }

        Ok((Self::default(), None))
    }

    /// Write this config to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        ConfigStore::new().save(path, self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let target = &self.target;
        if target.service_name.trim().is_empty() {
            return Err(Error::invalid_config("target.service_name must not be empty"));
        }
        if target.gui_executable.trim().is_empty() {
            return Err(Error::invalid_config("target.gui_executable must not be empty"));
        }
        if target.service_executable.trim().is_empty() {
            return Err(Error::invalid_config(
                "target.service_executable must not be empty",
            ));
        }
        if target.install_dir.as_os_str().is_empty() {
            return Err(Error::invalid_config("target.install_dir must not be empty"));
        }
        if target.cli.program.trim().is_empty() {
            return Err(Error::invalid_config("target.cli.program must not be empty"));
        }
        if target.cli.connected_marker.is_empty() || target.cli.success_marker.is_empty() {
            return Err(Error::invalid_config("target.cli markers must not be empty"));
        }
        if self.poll.max_attempts == 0 {
            return Err(Error::invalid_config("poll.max_attempts must be at least 1"));
        }
        Ok(())
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll.into()
    }
}
